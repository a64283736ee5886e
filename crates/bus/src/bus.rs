//! Event bus: queue, registries and the dispatch thread.

use std::any::Any;
use std::hint;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use log::{debug, error, info, warn};
use meridian_core::{Event, EventKind, EventRef, SystemEventType};
use meridian_ports::{EventSink, HandlerRef, PublishError};
use parking_lot::{Condvar, Mutex, RwLock};

use crate::config::BusConfig;
use crate::error::{BusError, Result};
use crate::queue::BoundedEventQueue;
use crate::registry::HandlerRegistry;

/// Counters exposed for monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    pub published: u64,
    pub dispatched: u64,
    pub dropped: u64,
    pub handler_failures: u64,
}

/// Producer-facing half: the queue and the wake-up signal.
///
/// Holds no handlers, so handlers can keep a publisher without forming a
/// reference cycle with the registry.
struct Channel {
    queue: BoundedEventQueue<EventRef>,
    running: AtomicBool,
    wake_lock: Mutex<()>,
    wake: Condvar,
    publish_retries: u32,
    spin_before_yield: u32,
    published: AtomicU64,
    dispatched: AtomicU64,
    dropped: AtomicU64,
    handler_failures: AtomicU64,
}

impl Channel {
    fn notify(&self) {
        let _guard = self.wake_lock.lock();
        self.wake.notify_one();
    }

    fn publish(&self, event: EventRef) -> std::result::Result<(), PublishError> {
        let mut pending = event;
        let mut attempts: u32 = 0;
        loop {
            match self.queue.push(pending) {
                Ok(()) => {
                    self.published.fetch_add(1, Ordering::Relaxed);
                    self.notify();
                    return Ok(());
                }
                Err(back) => {
                    attempts += 1;
                    if attempts >= self.publish_retries {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            "[BUS] queue full, dropping {} event after {} attempts",
                            back.kind(),
                            attempts
                        );
                        // Wake the consumer so it can make room.
                        self.notify();
                        return Err(PublishError::QueueFull {
                            capacity: self.queue.capacity(),
                            attempts,
                        });
                    }
                    pending = back;
                    if attempts <= self.spin_before_yield {
                        hint::spin_loop();
                    } else {
                        thread::yield_now();
                    }
                }
            }
        }
    }
}

/// Cloneable publishing handle
#[derive(Clone)]
pub struct EventPublisher {
    channel: Arc<Channel>,
}

impl EventPublisher {
    /// Enqueue an event and wake the dispatch thread.
    ///
    /// Only retries (spin, then yield) while the queue is full; gives up with
    /// `PublishError::QueueFull` once the configured attempts are spent.
    pub fn publish(&self, event: EventRef) -> std::result::Result<(), PublishError> {
        self.channel.publish(event)
    }
}

impl EventSink for EventPublisher {
    fn publish(&self, event: EventRef) -> std::result::Result<(), PublishError> {
        self.channel.publish(event)
    }
}

/// Single-consumer event bus
pub struct EventBus {
    config: BusConfig,
    channel: Arc<Channel>,
    registry: Arc<RwLock<HandlerRegistry>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl EventBus {
    pub fn new(config: BusConfig) -> Self {
        let channel = Arc::new(Channel {
            queue: BoundedEventQueue::with_capacity(config.queue_capacity),
            running: AtomicBool::new(false),
            wake_lock: Mutex::new(()),
            wake: Condvar::new(),
            publish_retries: config.publish_retries.max(1),
            spin_before_yield: config.spin_before_yield,
            published: AtomicU64::new(0),
            dispatched: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            handler_failures: AtomicU64::new(0),
        });

        Self {
            config,
            channel,
            registry: Arc::new(RwLock::new(HandlerRegistry::default())),
            worker: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    pub fn publisher(&self) -> EventPublisher {
        EventPublisher {
            channel: Arc::clone(&self.channel),
        }
    }

    /// Same as `publisher().publish(event)`
    pub fn publish(&self, event: EventRef) -> std::result::Result<(), PublishError> {
        self.channel.publish(event)
    }

    pub fn is_running(&self) -> bool {
        self.channel.running.load(Ordering::Acquire)
    }

    /// Spawn the dispatch thread and announce startup on the bus.
    pub fn start(&self) -> Result<()> {
        if self.channel.running.swap(true, Ordering::AcqRel) {
            return Err(BusError::AlreadyRunning);
        }

        let channel = Arc::clone(&self.channel);
        let registry = Arc::clone(&self.registry);
        let batch_size = self.config.batch_size.max(1);

        let spawned = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || dispatch_loop(&channel, &registry, batch_size));

        match spawned {
            Ok(handle) => *self.worker.lock() = Some(handle),
            Err(e) => {
                self.channel.running.store(false, Ordering::Release);
                return Err(BusError::Spawn(e.to_string()));
            }
        }

        info!(
            "[BUS] dispatch thread '{}' started (capacity={}, batch={})",
            self.config.thread_name,
            self.channel.queue.capacity(),
            batch_size
        );

        self.channel
            .publish(Event::system(SystemEventType::Startup, "event bus started"))?;
        Ok(())
    }

    /// Stop dispatching, join the thread and discard whatever is still queued.
    ///
    /// Idempotent. A batch in flight completes first. Called from a handler
    /// (i.e. on the dispatch thread itself), the thread is not joined; it
    /// exits once the current handler returns.
    pub fn stop(&self) {
        if !self.channel.running.swap(false, Ordering::AcqRel) {
            debug!("[BUS] stop requested but bus is not running");
            return;
        }

        {
            let _guard = self.channel.wake_lock.lock();
            self.channel.wake.notify_all();
        }

        if let Some(handle) = self.worker.lock().take() {
            if handle.thread().id() == thread::current().id() {
                warn!("[BUS] stop called from the dispatch thread; not joining");
            } else if handle.join().is_err() {
                error!("[BUS] dispatch thread panicked");
            }
        }

        let mut discarded = 0usize;
        while self.channel.queue.pop().is_some() {
            discarded += 1;
        }
        info!("[BUS] stopped, {} queued events discarded", discarded);
    }

    /// Register a handler for every event. Returns false if already registered.
    pub fn register(&self, handler: HandlerRef) -> bool {
        let added = self.registry.write().add_global(Arc::clone(&handler));
        if added {
            debug!("[BUS] registered global handler '{}'", handler.name());
        }
        added
    }

    /// Remove a handler from the global list and every typed list.
    pub fn unregister(&self, handler: &HandlerRef) -> bool {
        let removed = self.registry.write().remove_global(handler);
        if removed {
            debug!("[BUS] unregistered handler '{}'", handler.name());
        }
        removed
    }

    /// Register a handler for one event kind. Returns false if already registered.
    pub fn register_for(&self, kind: EventKind, handler: HandlerRef) -> bool {
        let added = self.registry.write().add_typed(kind, Arc::clone(&handler));
        if added {
            debug!("[BUS] registered '{}' for {}", handler.name(), kind);
        }
        added
    }

    pub fn unregister_for(&self, kind: EventKind, handler: &HandlerRef) -> bool {
        self.registry.write().remove_typed(kind, handler)
    }

    pub fn is_registered(&self, handler: &HandlerRef) -> bool {
        self.registry.read().contains(handler)
    }

    pub fn handler_count(&self, kind: Option<EventKind>) -> usize {
        let registry = self.registry.read();
        match kind {
            Some(kind) => registry.typed_count(kind),
            None => registry.global_count(),
        }
    }

    /// Drain up to `batch_size` events and deliver them on the calling thread.
    ///
    /// Returns the number of events dispatched. The dispatch thread calls the
    /// same routine; calling it by hand is meant for a bus that was never
    /// started (deterministic tests, single-threaded tools).
    pub fn dispatch_once(&self) -> usize {
        let mut buffer = Vec::with_capacity(self.config.batch_size.max(1));
        dispatch_batch(
            &self.channel,
            &self.registry,
            self.config.batch_size.max(1),
            &mut buffer,
        )
    }

    pub fn queued(&self) -> usize {
        self.channel.queue.approx_len()
    }

    pub fn stats(&self) -> BusStats {
        BusStats {
            published: self.channel.published.load(Ordering::Relaxed),
            dispatched: self.channel.dispatched.load(Ordering::Relaxed),
            dropped: self.channel.dropped.load(Ordering::Relaxed),
            handler_failures: self.channel.handler_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

impl EventSink for EventBus {
    fn publish(&self, event: EventRef) -> std::result::Result<(), PublishError> {
        self.channel.publish(event)
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        self.stop();
    }
}

fn dispatch_loop(channel: &Channel, registry: &RwLock<HandlerRegistry>, batch_size: usize) {
    let mut buffer = Vec::with_capacity(batch_size);
    debug!("[BUS] dispatch loop running");

    loop {
        {
            let mut guard = channel.wake_lock.lock();
            while channel.queue.is_empty() && channel.running.load(Ordering::Acquire) {
                channel.wake.wait(&mut guard);
            }
        }

        if !channel.running.load(Ordering::Acquire) {
            break;
        }

        let mut delivered = 0;
        while channel.running.load(Ordering::Acquire) {
            let n = dispatch_batch(channel, registry, batch_size, &mut buffer);
            if n == 0 {
                break;
            }
            delivered += n;
        }

        if delivered == 0 {
            // A producer claimed a slot but has not published it yet.
            thread::yield_now();
        }
    }

    debug!("[BUS] dispatch loop exited");
}

fn dispatch_batch(
    channel: &Channel,
    registry: &RwLock<HandlerRegistry>,
    batch_size: usize,
    buffer: &mut Vec<EventRef>,
) -> usize {
    buffer.clear();
    while buffer.len() < batch_size {
        match channel.queue.pop() {
            Some(event) => buffer.push(event),
            None => break,
        }
    }

    for event in buffer.iter() {
        // Snapshot, so handlers may publish or (un)register without deadlock.
        let targets = registry.read().targets_for(event.kind());
        for handler in &targets {
            deliver(channel, handler, event);
        }
    }

    let n = buffer.len();
    channel.dispatched.fetch_add(n as u64, Ordering::Relaxed);
    buffer.clear();
    n
}

fn deliver(channel: &Channel, handler: &HandlerRef, event: &EventRef) {
    match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(event))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            channel.handler_failures.fetch_add(1, Ordering::Relaxed);
            error!(
                "[BUS] handler '{}' failed on {} event: {}",
                handler.name(),
                event.kind(),
                e
            );
        }
        Err(payload) => {
            channel.handler_failures.fetch_add(1, Ordering::Relaxed);
            error!(
                "[BUS] handler '{}' panicked on {} event: {}",
                handler.name(),
                event.kind(),
                panic_message(payload.as_ref())
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
