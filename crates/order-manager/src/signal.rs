//! Signal translation - what strategies output becomes an order intent
//!
//! Strategies don't place orders directly. They emit a signal naming the
//! exposure they want; the pipeline turns it into a limit order at the
//! signal price, owned by the emitting strategy.

use meridian_core::{
    Direction, Offset, OrderData, PriceType, SignalType, StrategySignalData, Timestamp,
};

/// Direction and offset that realize a signal
pub fn direction_offset(signal_type: SignalType) -> (Direction, Offset) {
    match signal_type {
        SignalType::OpenLong => (Direction::Buy, Offset::Open),
        SignalType::CloseLong => (Direction::Sell, Offset::Close),
        SignalType::OpenShort => (Direction::Sell, Offset::Open),
        SignalType::CloseShort => (Direction::Buy, Offset::Close),
    }
}

/// New order intent (status Submitting) for `signal`
pub fn order_from_signal(signal: &StrategySignalData, at: Timestamp) -> OrderData {
    let (direction, offset) = direction_offset(signal.signal_type);
    OrderData::new_with_time(
        signal.symbol.clone(),
        direction,
        offset,
        signal.price,
        signal.volume,
        at,
    )
    .with_price_type(PriceType::Limit)
    .with_strategy(signal.strategy_id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use meridian_core::OrderStatus;
    use rust_decimal_macros::dec;

    fn signal(signal_type: SignalType) -> StrategySignalData {
        StrategySignalData {
            strategy_id: "ma".to_string(),
            symbol: "rb2405".to_string(),
            signal_type,
            price: dec!(3500),
            volume: 2,
            stop_loss: dec!(3430),
            take_profit: dec!(3675),
            signal_time: Utc::now(),
            comment: String::new(),
        }
    }

    #[test]
    fn test_signal_mapping() {
        assert_eq!(direction_offset(SignalType::OpenLong), (Direction::Buy, Offset::Open));
        assert_eq!(direction_offset(SignalType::CloseLong), (Direction::Sell, Offset::Close));
        assert_eq!(direction_offset(SignalType::OpenShort), (Direction::Sell, Offset::Open));
        assert_eq!(direction_offset(SignalType::CloseShort), (Direction::Buy, Offset::Close));
    }

    #[test]
    fn test_order_carries_signal_fields() {
        let order = order_from_signal(&signal(SignalType::OpenShort), Utc::now());
        assert_eq!(order.status, OrderStatus::Submitting);
        assert_eq!(order.price_type, PriceType::Limit);
        assert_eq!(order.price, dec!(3500));
        assert_eq!(order.volume, 2);
        assert_eq!(order.direction, Direction::Sell);
        assert_eq!(order.strategy_id, "ma");
        assert!(!order.order_id.is_empty());
    }
}
