use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{RiskData, StrategySignalData, SystemEventData, SystemEventType};
use crate::entities::{AccountData, OrderData, PositionData, TradeData};
use crate::market_data::MarketDataField;
use crate::values::Timestamp;

/// Shared handle to an immutable event. Every handler that receives the
/// event during dispatch holds a clone of the same allocation.
pub type EventRef = Arc<Event>;

/// Discriminant used to key typed handler registries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    MarketData,
    Order,
    Trade,
    Position,
    Account,
    Risk,
    StrategySignal,
    System,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        EventKind::MarketData,
        EventKind::Order,
        EventKind::Trade,
        EventKind::Position,
        EventKind::Account,
        EventKind::Risk,
        EventKind::StrategySignal,
        EventKind::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::MarketData => "MarketData",
            EventKind::Order => "Order",
            EventKind::Trade => "Trade",
            EventKind::Position => "Position",
            EventKind::Account => "Account",
            EventKind::Risk => "Risk",
            EventKind::StrategySignal => "StrategySignal",
            EventKind::System => "System",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value struct per event kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    MarketData(MarketDataField),
    Order(OrderData),
    Trade(TradeData),
    Position(PositionData),
    Account(AccountData),
    Risk(RiskData),
    StrategySignal(StrategySignalData),
    System(SystemEventData),
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::MarketData(_) => EventKind::MarketData,
            EventPayload::Order(_) => EventKind::Order,
            EventPayload::Trade(_) => EventKind::Trade,
            EventPayload::Position(_) => EventKind::Position,
            EventPayload::Account(_) => EventKind::Account,
            EventPayload::Risk(_) => EventKind::Risk,
            EventPayload::StrategySignal(_) => EventKind::StrategySignal,
            EventPayload::System(_) => EventKind::System,
        }
    }
}

/// Timestamped, kind-tagged message carried on the bus.
///
/// Fields are private: once built, an event is never mutated. A handler that
/// needs a variation (e.g. a rejected copy of an order) builds a new event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    timestamp: Timestamp,
    payload: EventPayload,
}

impl Event {
    /// Create an event stamped with an explicit (clock-provided) time
    pub fn with_time(payload: EventPayload, timestamp: Timestamp) -> EventRef {
        Arc::new(Self { timestamp, payload })
    }

    /// Create an event stamped with current system time
    pub fn new(payload: EventPayload) -> EventRef {
        Self::with_time(payload, Utc::now())
    }

    pub fn market_data(data: MarketDataField) -> EventRef {
        Self::new(EventPayload::MarketData(data))
    }

    pub fn order(data: OrderData) -> EventRef {
        Self::new(EventPayload::Order(data))
    }

    pub fn trade(data: TradeData) -> EventRef {
        Self::new(EventPayload::Trade(data))
    }

    pub fn position(data: PositionData) -> EventRef {
        Self::new(EventPayload::Position(data))
    }

    pub fn account(data: AccountData) -> EventRef {
        Self::new(EventPayload::Account(data))
    }

    pub fn risk(data: RiskData) -> EventRef {
        Self::new(EventPayload::Risk(data))
    }

    pub fn signal(data: StrategySignalData) -> EventRef {
        Self::new(EventPayload::StrategySignal(data))
    }

    pub fn system(event_type: SystemEventType, message: impl Into<String>) -> EventRef {
        Self::new(EventPayload::System(SystemEventData::new(event_type, message)))
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    pub fn as_market_data(&self) -> Option<&MarketDataField> {
        match &self.payload {
            EventPayload::MarketData(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_order(&self) -> Option<&OrderData> {
        match &self.payload {
            EventPayload::Order(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_trade(&self) -> Option<&TradeData> {
        match &self.payload {
            EventPayload::Trade(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_position(&self) -> Option<&PositionData> {
        match &self.payload {
            EventPayload::Position(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_risk(&self) -> Option<&RiskData> {
        match &self.payload {
            EventPayload::Risk(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_signal(&self) -> Option<&StrategySignalData> {
        match &self.payload {
            EventPayload::StrategySignal(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_system(&self) -> Option<&SystemEventData> {
        match &self.payload {
            EventPayload::System(data) => Some(data),
            _ => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ts = self.timestamp.format("%H:%M:%S%.3f");
        match &self.payload {
            EventPayload::MarketData(md) => {
                write!(f, "[{ts}] MarketData {} last={}", md.symbol, md.last_price)
            }
            EventPayload::Order(o) => write!(
                f,
                "[{ts}] Order {} {} {:?}/{:?} {}@{} traded={} {:?}",
                o.order_id,
                o.symbol,
                o.direction,
                o.offset,
                o.volume,
                o.price,
                o.traded_volume,
                o.status
            ),
            EventPayload::Trade(t) => write!(
                f,
                "[{ts}] Trade {} order={} {} {:?} {}@{}",
                t.trade_id, t.order_id, t.symbol, t.direction, t.volume, t.price
            ),
            EventPayload::Position(p) => write!(
                f,
                "[{ts}] Position {} {:?} total={} avg={}",
                p.symbol, p.direction, p.total_position, p.avg_price
            ),
            EventPayload::Account(a) => write!(
                f,
                "[{ts}] Account {} balance={} available={}",
                a.account_id, a.balance, a.available
            ),
            EventPayload::Risk(r) => write!(
                f,
                "[{ts}] Risk {:?}/{:?} strategy={} symbol={}: {}",
                r.level, r.risk_type, r.strategy_id, r.symbol, r.message
            ),
            EventPayload::StrategySignal(s) => write!(
                f,
                "[{ts}] Signal {} {} {:?} {}@{}",
                s.strategy_id, s.symbol, s.signal_type, s.volume, s.price
            ),
            EventPayload::System(s) => {
                write!(f, "[{ts}] System {:?}: {}", s.event_type, s.message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Direction, Offset};
    use rust_decimal_macros::dec;

    #[test]
    fn test_kind_matches_payload() {
        let md = Event::market_data(MarketDataField::new("rb2405", dec!(3500)));
        assert_eq!(md.kind(), EventKind::MarketData);
        assert!(md.as_market_data().is_some());
        assert!(md.as_order().is_none());

        let sys = Event::system(SystemEventType::Startup, "up");
        assert_eq!(sys.kind(), EventKind::System);
        assert_eq!(sys.as_system().map(|s| s.event_type), Some(SystemEventType::Startup));
    }

    #[test]
    fn test_shared_handle_points_to_same_event() {
        let order = OrderData::new("rb2405", Direction::Buy, Offset::Open, dec!(3500), 1);
        let event = Event::order(order);
        let other = Arc::clone(&event);
        assert!(Arc::ptr_eq(&event, &other));
        assert_eq!(other.as_order().map(|o| o.volume), Some(1));
    }

    #[test]
    fn test_display_is_single_line() {
        let event = Event::market_data(MarketDataField::new("rb2405", dec!(3500)));
        let line = event.to_string();
        assert!(line.contains("MarketData rb2405 last=3500"));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_every_kind_listed_once() {
        let kinds: std::collections::HashSet<_> = EventKind::ALL.iter().collect();
        assert_eq!(kinds.len(), EventKind::ALL.len());
    }
}
