//! Broker and market-data connectivity contracts.
//!
//! Concrete wire protocols live outside the core; the engine only relies on
//! these methods and on callbacks arriving from the connector's own threads.

use std::sync::Arc;

use meridian_core::{AccountData, MarketDataField, OrderData, OrderId, PositionData, TradeData};

use crate::error::ConnectorResult;

pub type MarketDataCallback = Arc<dyn Fn(MarketDataField) + Send + Sync>;
pub type OrderCallback = Arc<dyn Fn(OrderData) + Send + Sync>;
pub type TradeCallback = Arc<dyn Fn(TradeData) + Send + Sync>;
pub type PositionCallback = Arc<dyn Fn(PositionData) + Send + Sync>;
pub type AccountCallback = Arc<dyn Fn(AccountData) + Send + Sync>;

/// Market-data feed
pub trait MarketDataConnector: Send + Sync {
    /// Apply connector-specific configuration (front address, broker id...)
    fn init(&self, config: &str) -> ConnectorResult<()>;

    fn connect(&self) -> ConnectorResult<()>;

    fn disconnect(&self);

    fn is_connected(&self) -> bool;

    fn subscribe(&self, symbols: &[String]) -> ConnectorResult<()>;

    fn unsubscribe(&self, symbols: &[String]) -> ConnectorResult<()>;

    /// Install the per-tick callback. Replaces any previous callback.
    fn set_callback(&self, callback: MarketDataCallback);
}

/// Order routing and account queries
pub trait TradeConnector: Send + Sync {
    fn init(&self, config: &str) -> ConnectorResult<()>;

    fn connect(&self) -> ConnectorResult<()>;

    fn disconnect(&self);

    fn is_connected(&self) -> bool;

    fn login(&self, user_id: &str, password: &str) -> ConnectorResult<()>;

    fn logout(&self) -> ConnectorResult<()>;

    fn is_logged_in(&self) -> bool;

    /// Submit an order. The returned id is the broker's handle for the
    /// order; an empty id means the broker did not take it.
    fn place_order(&self, order: &OrderData) -> ConnectorResult<OrderId>;

    /// Request cancellation by broker order id. The Canceled status arrives
    /// later through the order callback.
    fn cancel_order(&self, order_id: &str) -> ConnectorResult<()>;

    fn query_pending_orders(&self) -> ConnectorResult<Vec<OrderData>>;

    fn query_order(&self, order_id: &str) -> ConnectorResult<Option<OrderData>>;

    fn query_positions(&self) -> ConnectorResult<Vec<PositionData>>;

    fn query_account(&self) -> ConnectorResult<AccountData>;

    fn set_order_callback(&self, callback: OrderCallback);

    fn set_trade_callback(&self, callback: TradeCallback);

    fn set_position_callback(&self, callback: PositionCallback);

    fn set_account_callback(&self, callback: AccountCallback);
}
