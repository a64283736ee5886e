//! Meridian Runner - Engine Context
//!
//! Builds and wires one trading session:
//!
//! - **EngineConfig**: bus sizing, risk limits, strategies, credentials
//! - **Engine**: owns every component, registers handlers, starts and stops them
//!
//! ## Architecture
//!
//! ```text
//!  MarketDataConnector                         TradeConnector
//!          │ ticks                                   ▲ place/cancel
//!          ▼                                         │ callbacks
//!  MarketDataService ──► ┌──────────────────────┐ ◄──┴── OrderPipeline
//!                        │       EventBus       │          ▲      │
//!                        └──┬────────┬────────┬─┘          │      │ intents
//!                MarketData │  Order/Trade    │ Signal     │      ▼
//!                           ▼        ▼        └────────────┘  RiskGate
//!               MarketDataCache  StrategyRuntime             (routes approved
//!                                                              intents back)
//! ```

pub mod config;
pub mod engine;
pub mod error;

pub use config::EngineConfig;
pub use engine::{Engine, EngineReport};
pub use error::{EngineError, Result};

/// Install `env_logger`, honouring `RUST_LOG` and defaulting to `info`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
