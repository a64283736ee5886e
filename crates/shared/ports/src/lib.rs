//! Meridian Ports
//!
//! Port definitions (traits) for the Meridian trading engine.
//! These define the boundaries between the event-driven core and
//! everything around it: time, event delivery, and broker connectivity.

mod clock;
mod connector;
mod error;
mod handler;
mod router;

pub use clock::Clock;
pub use connector::{
    AccountCallback, MarketDataCallback, MarketDataConnector, OrderCallback, PositionCallback,
    TradeCallback, TradeConnector,
};
pub use error::{ConnectorError, ConnectorResult, HandlerError, PublishError};
pub use handler::{EventHandler, EventSink, HandlerRef, same_handler};
pub use router::OrderRouter;
