//! Meridian Core Domain
//!
//! Pure domain types for the Meridian trading engine: the event envelope
//! carried on the bus and the value structs each event kind holds.
//! This crate contains no threads, no I/O, and is 100% unit testable.
//!
//! ```text
//!            Event (Arc, immutable)
//!  ┌──────────────┬────────────────────────────────────┐
//!  │ timestamp    │ EventPayload                       │
//!  │              │  MarketData(MarketDataField)       │
//!  │              │  Order(OrderData)                  │
//!  │              │  Trade(TradeData)                  │
//!  │              │  Position(PositionData)            │
//!  │              │  Account(AccountData)              │
//!  │              │  Risk(RiskData)                    │
//!  │              │  StrategySignal(StrategySignalData)│
//!  │              │  System(SystemEventData)           │
//!  └──────────────┴────────────────────────────────────┘
//! ```

pub mod entities;
pub mod events;
pub mod market_data;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{
    AccountData, Direction, Offset, OrderData, OrderId, OrderStatus, OrderTransitionError,
    PositionData, PositionDirection, PriceType, TradeData, TradeId,
};
pub use events::{
    Event, EventKind, EventPayload, EventRef, RiskData, RiskLevel, RiskType, SignalType,
    StrategySignalData, SystemEventData, SystemEventType,
};
pub use market_data::{DEPTH_LEVELS, MarketDataField};
pub use values::{Price, Symbol, Timestamp, Volume};
