//! Meridian Strategy Runtime
//!
//! Hosts trading strategies on the event bus:
//! - Registry with a Stopped / Running / Paused lifecycle per strategy
//! - Market data fanned out to every running strategy
//! - Order and trade updates routed to the owning strategy only
//! - Returned signals published back onto the bus
//!
//! ## Architecture
//!
//! ```text
//!   MarketData ─────┐
//!   Order / Trade ──┤
//!                   ▼
//!          ┌─────────────────┐        ┌──────────────────────┐
//!          │ StrategyRuntime │──────► │ Strategy (per id)    │
//!          │   (bus handler) │ ◄───── │ e.g. MA crossover    │
//!          └────────┬────────┘ signals└──────────────────────┘
//!                   │
//!                   ▼
//!          StrategySignal events ──► OrderPipeline
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meridian_strategy::{MaCrossoverParams, MovingAverageCrossover, StrategyRuntime};
//!
//! let runtime = StrategyRuntime::new(Arc::new(bus.publisher()));
//! let params = MaCrossoverParams::for_symbol("rb2405");
//! runtime.register(Box::new(MovingAverageCrossover::new("ma-rb", params)?))?;
//! runtime.start("ma-rb")?;
//! ```

pub mod error;
pub mod moving_average;
pub mod runtime;
pub mod strategy;

// Re-export main types
pub use error::{Result, StrategyError};
pub use moving_average::{MaCrossoverParams, MovingAverageCrossover};
pub use runtime::StrategyRuntime;
pub use strategy::{Strategy, StrategyStatus};
