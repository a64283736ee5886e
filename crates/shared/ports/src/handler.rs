use std::sync::Arc;

use meridian_core::EventRef;

use crate::error::{HandlerError, PublishError};

/// A component that receives events from the bus
///
/// Handlers are shared (`Arc`) between the registry and their owner and are
/// invoked from the dispatch thread, so they take `&self` and keep their
/// mutable state behind their own locks.
pub trait EventHandler: Send + Sync {
    /// Handler name used in logs when it fails
    fn name(&self) -> &str;

    /// React to one event. Errors are logged by the dispatcher.
    fn handle(&self, event: &EventRef) -> Result<(), HandlerError>;
}

pub type HandlerRef = Arc<dyn EventHandler>;

/// Identity comparison for registered handlers.
///
/// Compares the data pointers only; vtable pointers for the same type may
/// differ between codegen units.
pub fn same_handler(a: &HandlerRef, b: &HandlerRef) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Anything events can be published into
pub trait EventSink: Send + Sync {
    fn publish(&self, event: EventRef) -> Result<(), PublishError>;
}
