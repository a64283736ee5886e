use std::sync::Arc;

use chrono::{Duration, Utc};
use meridian_core::Timestamp;
use meridian_ports::Clock;
use parking_lot::RwLock;

/// Frozen clock for deterministic tests
///
/// Time never moves on its own; `advance` and `set_time` are the only way
/// forward. Cheap to share: clone the `Arc`.
#[derive(Debug)]
pub struct ManualClock {
    current: RwLock<Timestamp>,
}

impl ManualClock {
    pub fn new(initial: Timestamp) -> Arc<Self> {
        Arc::new(Self {
            current: RwLock::new(initial),
        })
    }

    /// Frozen at the current wall time
    pub fn starting_now() -> Arc<Self> {
        Self::new(Utc::now())
    }

    /// Move time forward (or backward, for a negative duration)
    pub fn advance(&self, duration: Duration) {
        *self.current.write() += duration;
    }

    /// Jump to an explicit time
    pub fn set_time(&self, time: Timestamp) {
        *self.current.write() = time;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.current.read()
    }

    fn name(&self) -> &str {
        "ManualClock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_is_frozen() {
        let clock = ManualClock::starting_now();
        let t1 = clock.now();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(clock.now(), t1);
    }

    #[test]
    fn test_advance_and_set() {
        let clock = ManualClock::starting_now();
        let t0 = clock.now();

        clock.advance(Duration::seconds(5));
        assert_eq!(clock.now() - t0, Duration::seconds(5));

        clock.set_time(t0);
        assert_eq!(clock.now(), t0);
    }

    #[test]
    fn test_usable_as_dyn_clock() {
        let manual = ManualClock::starting_now();
        let clock: Arc<dyn Clock> = manual.clone();
        manual.advance(Duration::milliseconds(250));
        assert_eq!(clock.now(), manual.now());
        assert_eq!(clock.name(), "ManualClock");
    }
}
