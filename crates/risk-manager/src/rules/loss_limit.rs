use log::warn;
use meridian_core::{Event, Offset, RiskLevel, RiskType};
use parking_lot::Mutex;
use rust_decimal::Decimal;

use super::{RiskDecision, RiskRule, order_intent};

#[derive(Debug, Default)]
struct LossState {
    daily_loss: Decimal,
}

/// Realized-loss guard.
///
/// Accumulates losses from Trade events (`realized_pnl < 0`). A single fill
/// losing more than `max_loss_per_trade` is flagged. Once the day's losses
/// reach `max_daily_loss`, new opening intents are refused until
/// `reset_daily`. Closing intents always pass.
pub struct LossLimitRule {
    name: String,
    max_loss_per_trade: Decimal,
    max_daily_loss: Decimal,
    state: Mutex<LossState>,
}

impl LossLimitRule {
    pub fn new(max_loss_per_trade: Decimal, max_daily_loss: Decimal) -> Self {
        Self {
            name: "LossLimitRule".to_string(),
            max_loss_per_trade,
            max_daily_loss,
            state: Mutex::new(LossState::default()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a loss (positive amount) booked outside the trade stream
    pub fn update_loss(&self, loss: Decimal) {
        self.state.lock().daily_loss += loss;
    }

    /// Start a new trading day
    pub fn reset_daily(&self) {
        self.state.lock().daily_loss = Decimal::ZERO;
    }

    pub fn daily_loss(&self) -> Decimal {
        self.state.lock().daily_loss
    }

    pub fn is_halted(&self) -> bool {
        self.daily_loss() >= self.max_daily_loss
    }
}

impl RiskRule for LossLimitRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn risk_type(&self) -> RiskType {
        RiskType::LossLimit
    }

    fn level(&self) -> RiskLevel {
        RiskLevel::Error
    }

    fn check(&self, event: &Event) -> RiskDecision {
        if let Some(trade) = event.as_trade() {
            if trade.realized_pnl >= Decimal::ZERO {
                return RiskDecision::Approved;
            }
            let loss = -trade.realized_pnl;
            let daily = {
                let mut state = self.state.lock();
                state.daily_loss += loss;
                state.daily_loss
            };
            if loss > self.max_loss_per_trade {
                return RiskDecision::Rejected(format!(
                    "trade {} lost {} (max per trade {})",
                    trade.trade_id, loss, self.max_loss_per_trade
                ));
            }
            if daily >= self.max_daily_loss {
                warn!(
                    "[RISK] {}: daily loss {} reached limit {}",
                    self.name, daily, self.max_daily_loss
                );
            }
            return RiskDecision::Approved;
        }

        let Some(order) = order_intent(event) else {
            return RiskDecision::Approved;
        };
        if order.offset != Offset::Open {
            return RiskDecision::Approved;
        }

        let daily = self.daily_loss();
        if daily >= self.max_daily_loss {
            RiskDecision::Rejected(format!(
                "daily loss {} reached limit {}",
                daily, self.max_daily_loss
            ))
        } else {
            RiskDecision::Approved
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use meridian_core::{Direction, OrderData, TradeData};
    use rust_decimal_macros::dec;

    fn closing_trade(pnl: Decimal) -> meridian_core::EventRef {
        let mut trade = TradeData::new(
            "T1",
            "O1",
            "rb2405",
            Direction::Sell,
            Offset::Close,
            dec!(3500),
            1,
            Utc::now(),
        );
        trade.realized_pnl = pnl;
        Event::trade(trade)
    }

    fn open_intent() -> meridian_core::EventRef {
        Event::order(OrderData::new("rb2405", Direction::Buy, Offset::Open, dec!(3500), 1))
    }

    #[test]
    fn test_accumulates_only_losses() {
        let rule = LossLimitRule::new(dec!(100), dec!(250));
        assert!(rule.check(&closing_trade(dec!(40))).is_approved());
        assert!(rule.check(&closing_trade(dec!(-60))).is_approved());
        assert!(rule.check(&closing_trade(dec!(-90))).is_approved());
        assert_eq!(rule.daily_loss(), dec!(150));
        assert!(rule.check(&open_intent()).is_approved());
    }

    #[test]
    fn test_single_trade_over_limit_is_flagged() {
        let rule = LossLimitRule::new(dec!(100), dec!(1000));
        assert!(!rule.check(&closing_trade(dec!(-150))).is_approved());
        assert_eq!(rule.daily_loss(), dec!(150));
    }

    #[test]
    fn test_daily_limit_halts_opening_orders_until_reset() {
        let rule = LossLimitRule::new(dec!(1000), dec!(200));
        rule.update_loss(dec!(120));
        assert!(rule.check(&closing_trade(dec!(-80))).is_approved());
        assert!(rule.is_halted());
        assert!(!rule.check(&open_intent()).is_approved());

        let close = OrderData::new("rb2405", Direction::Sell, Offset::Close, dec!(3500), 1);
        assert!(rule.check(&Event::order(close)).is_approved());

        rule.reset_daily();
        assert!(rule.check(&open_intent()).is_approved());
    }
}
