use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Duration;
use dashmap::DashMap;
use log::debug;
use meridian_clock::SystemClock;
use meridian_core::{Event, RiskType, Timestamp};
use meridian_ports::Clock;

use super::{RiskDecision, RiskRule, order_intent};

/// Sliding-window cap on order intents per strategy.
///
/// Every intent is recorded, including the one that trips the limit, and
/// entries older than the window are pruned before counting.
pub struct OrderFrequencyRule {
    name: String,
    max_orders: usize,
    window: Duration,
    clock: Arc<dyn Clock>,
    history: DashMap<String, VecDeque<Timestamp>>,
}

impl OrderFrequencyRule {
    /// At most `max_orders` intents per strategy inside any `window`.
    pub fn new(max_orders: usize, window: Duration) -> Self {
        Self {
            name: "OrderFrequencyRule".to_string(),
            max_orders,
            window,
            clock: SystemClock::shared(),
            history: DashMap::new(),
        }
    }

    /// Rate form: `rate_per_sec × window_secs` intents per window.
    pub fn per_second(rate_per_sec: usize, window_secs: i64) -> Self {
        let window_secs = window_secs.max(1);
        Self::new(
            rate_per_sec.saturating_mul(window_secs as usize),
            Duration::seconds(window_secs),
        )
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn max_orders(&self) -> usize {
        self.max_orders
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Intents recorded for `strategy_id` that are still inside the window
    pub fn recent_orders(&self, strategy_id: &str) -> usize {
        let cutoff = self.clock.now() - self.window;
        self.history
            .get(strategy_id)
            .map_or(0, |times| times.iter().filter(|t| **t >= cutoff).count())
    }
}

impl RiskRule for OrderFrequencyRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn risk_type(&self) -> RiskType {
        RiskType::OrderFrequencyLimit
    }

    fn check(&self, event: &Event) -> RiskDecision {
        let Some(order) = order_intent(event) else {
            return RiskDecision::Approved;
        };

        let now = self.clock.now();
        let cutoff = now - self.window;

        let mut times = self.history.entry(order.strategy_id.clone()).or_default();
        while times.front().is_some_and(|t| *t < cutoff) {
            times.pop_front();
        }
        times.push_back(now);

        let count = times.len();
        debug!(
            "[RISK] {}: strategy '{}' has {} orders in window",
            self.name, order.strategy_id, count
        );

        if count > self.max_orders {
            RiskDecision::Rejected(format!(
                "{} orders from strategy '{}' within {}s (max {})",
                count,
                order.strategy_id,
                self.window.num_seconds(),
                self.max_orders
            ))
        } else {
            RiskDecision::Approved
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_clock::ManualClock;
    use meridian_core::{Direction, Offset, OrderData, OrderStatus};
    use rust_decimal_macros::dec;

    fn intent(strategy: &str) -> meridian_core::EventRef {
        Event::order(
            OrderData::new("rb2405", Direction::Buy, Offset::Open, dec!(3500), 1)
                .with_strategy(strategy),
        )
    }

    #[test]
    fn test_eleventh_order_in_window_rejected() {
        let clock = ManualClock::starting_now();
        let rule = OrderFrequencyRule::new(10, Duration::seconds(5)).with_clock(clock.clone());

        for _ in 0..10 {
            assert!(rule.check(&intent("MA_01")).is_approved());
            clock.advance(Duration::milliseconds(100));
        }
        assert!(!rule.check(&intent("MA_01")).is_approved());

        clock.advance(Duration::seconds(6));
        assert!(rule.check(&intent("MA_01")).is_approved());
    }

    #[test]
    fn test_windows_are_per_strategy() {
        let clock = ManualClock::starting_now();
        let rule = OrderFrequencyRule::new(2, Duration::seconds(5)).with_clock(clock);

        assert!(rule.check(&intent("a")).is_approved());
        assert!(rule.check(&intent("a")).is_approved());
        assert!(!rule.check(&intent("a")).is_approved());
        assert!(rule.check(&intent("b")).is_approved());
        assert_eq!(rule.recent_orders("b"), 1);
    }

    #[test]
    fn test_order_updates_are_not_counted() {
        let rule = OrderFrequencyRule::new(1, Duration::seconds(5));
        let mut accepted = OrderData::new("rb2405", Direction::Buy, Offset::Open, dec!(3500), 1)
            .with_strategy("a");
        accepted.status = OrderStatus::Accepted;

        for _ in 0..5 {
            assert!(rule.check(&Event::order(accepted.clone())).is_approved());
        }
        assert_eq!(rule.recent_orders("a"), 0);
    }

    #[test]
    fn test_per_second_threshold() {
        let rule = OrderFrequencyRule::per_second(10, 5);
        assert_eq!(rule.max_orders(), 50);
        assert_eq!(rule.window(), Duration::seconds(5));
    }
}
