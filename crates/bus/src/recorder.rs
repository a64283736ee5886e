//! Handler that keeps every event it receives.
//!
//! Used as an operator tap and by tests that assert on what reached the bus.

use std::sync::Arc;
use std::time::{Duration, Instant};

use meridian_core::{EventKind, EventRef};
use meridian_ports::{EventHandler, HandlerError};
use parking_lot::Mutex;

pub struct EventRecorder {
    name: String,
    events: Mutex<Vec<EventRef>>,
}

impl EventRecorder {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            events: Mutex::new(Vec::new()),
        })
    }

    /// Everything received so far, in delivery order
    pub fn events(&self) -> Vec<EventRef> {
        self.events.lock().clone()
    }

    pub fn of_kind(&self, kind: EventKind) -> Vec<EventRef> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind() == kind).count()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Poll until `done` holds over the recorded events or `timeout` passes.
    pub fn wait_until<F>(&self, timeout: Duration, done: F) -> bool
    where
        F: Fn(&[EventRef]) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            if done(&self.events.lock()) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
    }
}

impl EventHandler for EventRecorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, event: &EventRef) -> Result<(), HandlerError> {
        self.events.lock().push(Arc::clone(event));
        Ok(())
    }
}
