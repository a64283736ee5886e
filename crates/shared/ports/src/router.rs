use meridian_core::OrderData;

/// Destination for order intents that cleared the risk gate
pub trait OrderRouter: Send + Sync {
    /// Forward an approved order for placement.
    ///
    /// Returns true when the broker took the order (non-empty broker id).
    fn route(&self, order: &OrderData) -> bool;
}
