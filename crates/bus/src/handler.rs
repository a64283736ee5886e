//! Closure-backed handler for small subscribers and taps.

use std::sync::Arc;

use meridian_core::EventRef;
use meridian_ports::{EventHandler, HandlerError};

pub struct FnHandler<F> {
    name: String,
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&EventRef) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            f,
        })
    }
}

impl<F> EventHandler for FnHandler<F>
where
    F: Fn(&EventRef) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, event: &EventRef) -> Result<(), HandlerError> {
        (self.f)(event)
    }
}
