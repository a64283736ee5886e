//! Bounded multi-producer/multi-consumer ring of event handles.
//!
//! Every slot carries a sequence stamp. For the lap that starts at
//! position `p` a slot is:
//!
//! ```text
//!   sequence == p          free, a producer may claim position p
//!   sequence == p + 1      written, a consumer may claim position p
//!   sequence == p + cap    consumed, free again for the next lap
//! ```
//!
//! Producers and consumers claim positions with a CAS on their own cursor
//! and then publish by bumping the slot stamp. A slot is never handed to a
//! new producer until the consumer that owns it has moved the value out,
//! so a lapped writer cannot overwrite a value that is still being read.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

struct Slot<T> {
    sequence: AtomicUsize,
    value: UnsafeCell<MaybeUninit<T>>,
}

/// Fixed-capacity lock-free queue, preallocated at construction.
pub struct BoundedEventQueue<T> {
    slots: Box<[Slot<T>]>,
    mask: usize,
    enqueue_pos: CachePadded<AtomicUsize>,
    dequeue_pos: CachePadded<AtomicUsize>,
}

// SAFETY: values move between threads through the slots; access to each
// slot's cell is serialized by the sequence protocol.
unsafe impl<T: Send> Send for BoundedEventQueue<T> {}
unsafe impl<T: Send> Sync for BoundedEventQueue<T> {}

impl<T> BoundedEventQueue<T> {
    /// Create a queue holding at least `capacity` items.
    ///
    /// Capacity is rounded up to a power of two (minimum 2).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2).next_power_of_two();
        let slots = (0..capacity)
            .map(|i| Slot {
                sequence: AtomicUsize::new(i),
                value: UnsafeCell::new(MaybeUninit::uninit()),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            slots,
            mask: capacity - 1,
            enqueue_pos: CachePadded::new(AtomicUsize::new(0)),
            dequeue_pos: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Append `value`. Hands the value back when the ring is full.
    pub fn push(&self, value: T) -> Result<(), T> {
        let mut pos = self.enqueue_pos.load(Ordering::Relaxed);
        loop {
            let slot = &self.slots[pos & self.mask];
            let seq = slot.sequence.load(Ordering::Acquire);
            let lag = seq.wrapping_sub(pos) as isize;

            if lag == 0 {
                match self.enqueue_pos.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // SAFETY: winning the CAS for `pos` gives this producer
                        // sole access to the slot until the stamp is bumped.
                        unsafe { (*slot.value.get()).write(value) };
                        slot.sequence.store(pos.wrapping_add(1), Ordering::Release);
                        return Ok(());
                    }
                    Err(current) => pos = current,
                }
            } else if lag < 0 {
                // Slot still holds last lap's value: full.
                return Err(value);
            } else {
                pos = self.enqueue_pos.load(Ordering::Relaxed);
            }
        }
    }

    /// Remove the oldest item. Never blocks; `None` when empty.
    pub fn pop(&self) -> Option<T> {
        let mut pos = self.dequeue_pos.load(Ordering::Relaxed);
        loop {
            let slot = &self.slots[pos & self.mask];
            let seq = slot.sequence.load(Ordering::Acquire);
            let lag = seq.wrapping_sub(pos.wrapping_add(1)) as isize;

            if lag == 0 {
                match self.dequeue_pos.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // SAFETY: the stamp says the slot was written for `pos`
                        // and the CAS makes this consumer its only reader.
                        let value = unsafe { (*slot.value.get()).assume_init_read() };
                        slot.sequence
                            .store(pos.wrapping_add(self.capacity()), Ordering::Release);
                        return Some(value);
                    }
                    Err(current) => pos = current,
                }
            } else if lag < 0 {
                // Not written yet for this lap: empty (or a producer is mid-write).
                return None;
            } else {
                pos = self.dequeue_pos.load(Ordering::Relaxed);
            }
        }
    }

    /// True when no position has been claimed beyond the consumer cursor.
    pub fn is_empty(&self) -> bool {
        let head = self.dequeue_pos.load(Ordering::Acquire);
        let tail = self.enqueue_pos.load(Ordering::Acquire);
        tail == head
    }

    /// Snapshot of the number of queued items. Diagnostic only: the value
    /// may be stale by the time the caller reads it.
    pub fn approx_len(&self) -> usize {
        let head = self.dequeue_pos.load(Ordering::Relaxed);
        let tail = self.enqueue_pos.load(Ordering::Relaxed);
        tail.wrapping_sub(head).min(self.capacity())
    }
}

impl<T> Drop for BoundedEventQueue<T> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_capacity_rounds_to_power_of_two() {
        assert_eq!(BoundedEventQueue::<u32>::with_capacity(0).capacity(), 2);
        assert_eq!(BoundedEventQueue::<u32>::with_capacity(1000).capacity(), 1024);
        assert_eq!(BoundedEventQueue::<u32>::with_capacity(1024).capacity(), 1024);
    }

    #[test]
    fn test_pop_on_empty_returns_none() {
        let queue = BoundedEventQueue::<u32>::with_capacity(4);
        assert!(queue.is_empty());
        assert_eq!(queue.pop(), None);
        assert_eq!(queue.approx_len(), 0);
    }

    #[test]
    fn test_fifo_with_interleaved_pops() {
        let queue = BoundedEventQueue::with_capacity(8);
        let mut expected = 0;
        let mut next = 0;

        for round in 0..50 {
            for _ in 0..(round % 5 + 1) {
                if queue.push(next).is_ok() {
                    next += 1;
                }
            }
            for _ in 0..(round % 3 + 1) {
                if let Some(v) = queue.pop() {
                    assert_eq!(v, expected);
                    expected += 1;
                }
            }
        }
        while let Some(v) = queue.pop() {
            assert_eq!(v, expected);
            expected += 1;
        }
        assert_eq!(expected, next);
    }

    #[test]
    fn test_full_queue_hands_value_back() {
        let queue = BoundedEventQueue::with_capacity(4);
        for i in 0..4 {
            assert!(queue.push(i).is_ok());
        }
        assert_eq!(queue.push(99), Err(99));
        assert_eq!(queue.approx_len(), 4);

        assert_eq!(queue.pop(), Some(0));
        assert!(queue.push(4).is_ok());
        let drained: Vec<_> = std::iter::from_fn(|| queue.pop()).collect();
        assert_eq!(drained, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_wraps_many_laps() {
        let queue = BoundedEventQueue::with_capacity(2);
        for i in 0..10_000u32 {
            queue.push(i).unwrap();
            assert_eq!(queue.pop(), Some(i));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_drop_releases_queued_values() {
        let marker = Arc::new(());
        {
            let queue = BoundedEventQueue::with_capacity(4);
            queue.push(Arc::clone(&marker)).unwrap();
            queue.push(Arc::clone(&marker)).unwrap();
            assert_eq!(Arc::strong_count(&marker), 3);
        }
        assert_eq!(Arc::strong_count(&marker), 1);
    }

    #[test]
    fn test_concurrent_producers_preserve_per_producer_order() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 5_000;

        let queue = Arc::new(BoundedEventQueue::with_capacity(64));
        let handles: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        let mut item = (p, i);
                        while let Err(back) = queue.push(item) {
                            item = back;
                            thread::yield_now();
                        }
                    }
                })
            })
            .collect();

        let mut last_seen = [None::<usize>; PRODUCERS];
        let mut received = 0;
        while received < PRODUCERS * PER_PRODUCER {
            match queue.pop() {
                Some((p, i)) => {
                    if let Some(prev) = last_seen[p] {
                        assert!(i > prev, "producer {p} reordered: {i} after {prev}");
                    }
                    last_seen[p] = Some(i);
                    received += 1;
                }
                None => thread::yield_now(),
            }
        }

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(queue.is_empty());
    }
}
