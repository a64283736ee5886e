//! Risk limit configuration

use std::sync::Arc;

use chrono::Duration;
use meridian_ports::Clock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::rules::{LossLimitRule, OrderFrequencyRule, PositionLimitRule, RuleRef};

/// Limits the gate is built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLimits {
    /// Order intents allowed per strategy inside one frequency window
    pub max_orders_per_window: usize,
    pub frequency_window_secs: i64,
    pub max_position_per_symbol: u64,
    pub max_total_position: u64,
    pub max_loss_per_trade: Decimal,
    pub max_daily_loss: Decimal,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_orders_per_window: 10,
            frequency_window_secs: 5,
            max_position_per_symbol: 10,
            max_total_position: 50,
            max_loss_per_trade: dec!(1000),
            max_daily_loss: dec!(5000),
        }
    }
}

impl RiskLimits {
    pub fn with_position_limits(mut self, per_symbol: u64, total: u64) -> Self {
        self.max_position_per_symbol = per_symbol;
        self.max_total_position = total;
        self
    }

    pub fn with_order_frequency(mut self, max_orders: usize, window_secs: i64) -> Self {
        self.max_orders_per_window = max_orders;
        self.frequency_window_secs = window_secs.max(1);
        self
    }

    /// Frequency, position and loss rules, in that evaluation order
    pub fn build_rules(&self, clock: Arc<dyn Clock>) -> Vec<RuleRef> {
        let frequency = OrderFrequencyRule::new(
            self.max_orders_per_window,
            Duration::seconds(self.frequency_window_secs.max(1)),
        )
        .with_clock(clock);
        let position =
            PositionLimitRule::new(self.max_position_per_symbol, self.max_total_position);
        let loss = LossLimitRule::new(self.max_loss_per_trade, self.max_daily_loss);

        vec![
            Arc::new(frequency) as RuleRef,
            Arc::new(position),
            Arc::new(loss),
        ]
    }
}
