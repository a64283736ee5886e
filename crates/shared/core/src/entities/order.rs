use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Direction, Offset, OrderStatus, OrderTransitionError, PriceType};
use crate::values::Volume;

/// Order identifier. Locally generated ids are UUIDs; broker ids are opaque.
pub type OrderId = String;

/// Full order details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderData {
    pub order_id: OrderId,
    pub symbol: String,
    pub exchange: String,
    pub direction: Direction,
    pub offset: Offset,
    pub price_type: PriceType,
    pub price: Decimal,
    pub volume: Volume,
    pub traded_volume: Volume,
    pub status: OrderStatus,
    /// Free-form reason attached by the broker or the risk gate
    pub status_msg: String,
    /// Strategy that originated the order (empty for manual orders)
    pub strategy_id: String,
    pub account_id: String,
    pub insert_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl OrderData {
    /// Create a new limit order intent with explicit timestamp
    pub fn new_with_time(
        symbol: impl Into<String>,
        direction: Direction,
        offset: Offset,
        price: Decimal,
        volume: Volume,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id: Uuid::new_v4().to_string(),
            symbol: symbol.into(),
            exchange: String::new(),
            direction,
            offset,
            price_type: PriceType::Limit,
            price,
            volume,
            traded_volume: 0,
            status: OrderStatus::Submitting,
            status_msg: String::new(),
            strategy_id: String::new(),
            account_id: String::new(),
            insert_time: timestamp,
            update_time: timestamp,
        }
    }

    /// Create a new limit order intent using current system time
    pub fn new(
        symbol: impl Into<String>,
        direction: Direction,
        offset: Offset,
        price: Decimal,
        volume: Volume,
    ) -> Self {
        Self::new_with_time(symbol, direction, offset, price, volume, Utc::now())
    }

    pub fn with_strategy(mut self, strategy_id: impl Into<String>) -> Self {
        self.strategy_id = strategy_id.into();
        self
    }

    pub fn with_price_type(mut self, price_type: PriceType) -> Self {
        self.price_type = price_type;
        self
    }

    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = exchange.into();
        self
    }

    /// Returns remaining volume to be filled
    pub fn remaining_volume(&self) -> Volume {
        self.volume.saturating_sub(self.traded_volume)
    }

    /// Returns true if the order is completely filled
    pub fn is_filled(&self) -> bool {
        self.traded_volume >= self.volume
    }

    /// Move to `next`, enforcing the lifecycle.
    pub fn transition(
        &mut self,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<(), OrderTransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderTransitionError::IllegalTransition {
                order_id: self.order_id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.update_time = at;
        Ok(())
    }

    /// Copy of this order forced to `Rejected`, keeping its identity.
    pub fn rejected(&self, reason: impl Into<String>, at: DateTime<Utc>) -> Self {
        let mut order = self.clone();
        order.status = OrderStatus::Rejected;
        order.status_msg = reason.into();
        order.update_time = at;
        order
    }

    /// Apply a fill and derive PartialFilled/Filled from the traded volume.
    ///
    /// A fill on an order still in `Submitting` implies the broker accepted it.
    pub fn apply_fill(
        &mut self,
        volume: Volume,
        at: DateTime<Utc>,
    ) -> Result<OrderStatus, OrderTransitionError> {
        if volume > self.remaining_volume() {
            return Err(OrderTransitionError::Overfill {
                order_id: self.order_id.clone(),
                fill: volume,
                remaining: self.remaining_volume(),
            });
        }
        if self.status == OrderStatus::Submitting {
            self.transition(OrderStatus::Accepted, at)?;
        }
        let next = if self.traded_volume + volume >= self.volume {
            OrderStatus::Filled
        } else {
            OrderStatus::PartialFilled
        };
        self.transition(next, at)?;
        self.traded_volume += volume;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(volume: Volume) -> OrderData {
        OrderData::new("rb2405", Direction::Buy, Offset::Open, dec!(3500), volume)
    }

    #[test]
    fn test_new_order_is_submitting() {
        let o = order(3).with_strategy("MA_01");
        assert_eq!(o.status, OrderStatus::Submitting);
        assert_eq!(o.price_type, PriceType::Limit);
        assert_eq!(o.strategy_id, "MA_01");
        assert_eq!(o.remaining_volume(), 3);
        assert!(!o.order_id.is_empty());
    }

    #[test]
    fn test_partial_then_full_fill() {
        let mut o = order(3);
        o.transition(OrderStatus::Accepted, Utc::now()).unwrap();

        assert_eq!(o.apply_fill(1, Utc::now()).unwrap(), OrderStatus::PartialFilled);
        assert_eq!(o.apply_fill(1, Utc::now()).unwrap(), OrderStatus::PartialFilled);
        assert_eq!(o.apply_fill(1, Utc::now()).unwrap(), OrderStatus::Filled);
        assert!(o.is_filled());
    }

    #[test]
    fn test_fill_on_submitting_implies_accept() {
        let mut o = order(1);
        assert_eq!(o.apply_fill(1, Utc::now()).unwrap(), OrderStatus::Filled);
    }

    #[test]
    fn test_overfill_rejected() {
        let mut o = order(1);
        o.transition(OrderStatus::Accepted, Utc::now()).unwrap();
        assert!(matches!(
            o.apply_fill(2, Utc::now()),
            Err(OrderTransitionError::Overfill { .. })
        ));
        assert_eq!(o.traded_volume, 0);
    }

    #[test]
    fn test_terminal_order_refuses_transition() {
        let mut o = order(1);
        o.transition(OrderStatus::Canceled, Utc::now()).unwrap();
        assert!(o.transition(OrderStatus::Accepted, Utc::now()).is_err());
        assert!(o.apply_fill(1, Utc::now()).is_err());
    }

    #[test]
    fn test_rejected_copy_keeps_identity() {
        let o = order(1);
        let r = o.rejected("PositionLimitRule", Utc::now());
        assert_eq!(r.order_id, o.order_id);
        assert_eq!(r.status, OrderStatus::Rejected);
        assert_eq!(o.status, OrderStatus::Submitting);
    }
}
