//! Meridian Gateway
//!
//! Connectivity layer for the Meridian trading engine. Provides:
//! - `MarketDataService`: connector ticks in, MarketData events out
//! - `MarketDataCache`: latest tick per symbol, fed from the bus
//! - Simulator connectors (paper broker, tick replay) behind the connector ports
//!
//! ## Architecture
//!
//! ```text
//! Feed / Broker (simulated or real)
//!         │ callbacks
//!    ┌────▼──────────────┐
//!    │ MarketDataService │──► MarketData events ──► EventBus
//!    │ OrderPipeline     │──► Order/Trade/Position/Account events
//!    └───────────────────┘
//! ```
//!
//! Broker-side order handling lives in the order manager; this crate only
//! provides the connectors it drives.

pub mod adapters;
pub mod error;
pub mod market_data;

pub use adapters::{PaperBrokerConfig, PaperTradeConnector, ReplayMarketDataConnector};
pub use error::{GatewayError, Result};
pub use market_data::{MarketDataCache, MarketDataService};
