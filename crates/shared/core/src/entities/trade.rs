use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Direction, Offset, OrderId};
use crate::values::Volume;

/// Broker-assigned trade identifier
pub type TradeId = String;

/// A fill reported by the broker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeData {
    pub trade_id: TradeId,
    pub order_id: OrderId,
    pub symbol: String,
    pub exchange: String,
    pub direction: Direction,
    pub offset: Offset,
    pub price: Decimal,
    pub volume: Volume,
    pub trade_time: DateTime<Utc>,
    /// Owning strategy, filled in from the order table when the broker omits it
    pub strategy_id: String,
    /// P&L realized by this fill against the position book (zero for opening fills)
    pub realized_pnl: Decimal,
}

impl TradeData {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        trade_id: impl Into<TradeId>,
        order_id: impl Into<OrderId>,
        symbol: impl Into<String>,
        direction: Direction,
        offset: Offset,
        price: Decimal,
        volume: Volume,
        trade_time: DateTime<Utc>,
    ) -> Self {
        Self {
            trade_id: trade_id.into(),
            order_id: order_id.into(),
            symbol: symbol.into(),
            exchange: String::new(),
            direction,
            offset,
            price,
            volume,
            trade_time,
            strategy_id: String::new(),
            realized_pnl: Decimal::ZERO,
        }
    }

    /// Traded notional
    pub fn notional(&self) -> Decimal {
        self.price * Decimal::from(self.volume)
    }
}
