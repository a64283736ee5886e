//! Meridian Risk Manager
//!
//! Admission control between order creation and broker submission.
//!
//! ## Architecture
//!
//! ```text
//!                       Order(Submitting)
//!                              │
//!                              ▼
//!   ┌───────────────────── RiskGate ─────────────────────┐
//!   │  OrderFrequencyRule ─► PositionLimitRule ─► LossLimitRule
//!   │        (first rejection short-circuits the chain)  │
//!   └──────────────┬──────────────────────┬──────────────┘
//!                  │ pass                 │ fail
//!                  ▼                      ▼
//!            OrderRouter           Risk event + Order(Rejected)
//!         (broker placement)          published on the bus
//! ```
//!
//! Rules also observe Trade and Position events to keep their own state
//! (realized loss, per-symbol exposure). Every rule guards that state with
//! its own lock, so an operator view may read it from any thread.

pub mod gate;
pub mod limits;
pub mod rules;

// Re-export main types
pub use gate::{GateStats, RiskGate};
pub use limits::RiskLimits;
pub use rules::{
    LossLimitRule, OrderFrequencyRule, PositionLimitRule, RiskDecision, RiskRule, RuleRef,
};
