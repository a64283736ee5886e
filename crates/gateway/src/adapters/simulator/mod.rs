//! Simulator connectors
//!
//! Paper broker and tick replay, for tests and dry runs.

mod paper;
mod replay;

pub use paper::{PaperBrokerConfig, PaperTradeConnector};
pub use replay::ReplayMarketDataConnector;
