//! Connector adapters
//!
//! Implementations of the market-data and trade connector ports. Only
//! in-process simulators live here; real broker protocols plug in behind
//! the same traits.

pub mod simulator;

pub use simulator::{PaperBrokerConfig, PaperTradeConnector, ReplayMarketDataConnector};
