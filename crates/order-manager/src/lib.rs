//! Meridian Order Manager
//!
//! The Order Manager sits between strategies and the broker, responsible for:
//! - **Signal Translation**: Turns strategy signals into limit-order intents
//! - **Order Table**: Owns every live order and drives its status machine
//! - **Placement**: Places intents the risk gate admits (`OrderRouter`)
//! - **Broker Callbacks**: Republishes acknowledgements, fills, positions and
//!   account snapshots as bus events
//! - **Position Tracking**: Per-symbol long/short books with realized and
//!   unrealized P&L
//!
//! ## Architecture
//!
//! ```text
//! StrategySignal ──► OrderPipeline::process_signal
//!                        │ Order(Submitting)
//!                        ▼
//!                    RiskGate ──(pass)──► OrderPipeline::route ──► TradeConnector
//!                                                                     │
//!        Order / Trade / Position / Account events ◄── callbacks ─────┘
//! ```
//!
//! Broker acknowledgements can arrive before `place_order` returns. They
//! are parked under the broker id and replayed once the id is mapped back
//! to the local order.

pub mod error;
pub mod pipeline;
pub mod position;
pub mod signal;

// Re-export main types
pub use error::{Error, Result};
pub use pipeline::OrderPipeline;
pub use position::{FillOutcome, PositionBook};
pub use signal::{direction_offset, order_from_signal};
