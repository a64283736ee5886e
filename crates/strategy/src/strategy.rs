//! Strategy trait and lifecycle status

use std::fmt;

use meridian_core::{MarketDataField, OrderData, StrategySignalData, Timestamp, TradeData};
use serde::{Deserialize, Serialize};

/// Lifecycle of a registered strategy
///
/// ```text
/// Stopped ──start──► Running ◄──resume── Paused
///    ▲                  │ └────pause────►  │
///    └───────stop───────┴──────stop────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StrategyStatus {
    #[default]
    Stopped,
    Running,
    Paused,
}

impl StrategyStatus {
    pub fn is_active(&self) -> bool {
        !matches!(self, StrategyStatus::Stopped)
    }
}

impl fmt::Display for StrategyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StrategyStatus::Stopped => "stopped",
            StrategyStatus::Running => "running",
            StrategyStatus::Paused => "paused",
        };
        f.write_str(s)
    }
}

/// Strategy trait - implement this for your trading strategy
///
/// Callbacks run on the bus dispatch thread, one at a time per strategy.
/// Strategies never publish directly: they return signals and the runtime
/// puts them on the bus.
pub trait Strategy: Send {
    /// Registry key; also stamped on every signal and order
    fn id(&self) -> &str;

    /// Strategy name for logging
    fn name(&self) -> &str {
        self.id()
    }

    /// Called on each Stopped → Running transition
    fn on_start(&mut self) {}

    /// Called on each transition into Stopped
    fn on_stop(&mut self) {}

    /// Called for every tick while Running
    fn on_market_data(&mut self, tick: &MarketDataField, at: Timestamp)
    -> Vec<StrategySignalData>;

    /// Called when one of this strategy's orders changes (optional)
    fn on_order(&mut self, _order: &OrderData) -> Vec<StrategySignalData> {
        Vec::new()
    }

    /// Called when one of this strategy's orders fills (optional)
    fn on_trade(&mut self, _trade: &TradeData) -> Vec<StrategySignalData> {
        Vec::new()
    }
}
