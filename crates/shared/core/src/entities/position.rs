use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Direction, Offset};
use crate::values::Volume;

/// Position side - long (bought) or short (sold)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionDirection {
    Long,
    Short,
}

impl PositionDirection {
    /// Which position a fill with this direction/offset touches.
    ///
    /// Buy-open and buy-close hit different books: buying to open adds to
    /// the long side, buying to close reduces the short side.
    pub fn affected_by(direction: Direction, offset: Offset) -> Self {
        match (direction, offset.is_close()) {
            (Direction::Buy, false) | (Direction::Sell, true) => PositionDirection::Long,
            (Direction::Sell, false) | (Direction::Buy, true) => PositionDirection::Short,
        }
    }
}

/// Aggregate position for one symbol and direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionData {
    pub symbol: String,
    pub direction: PositionDirection,
    pub total_position: Volume,
    pub today_position: Volume,
    pub yesterday_position: Volume,
    /// Volume-weighted open price
    pub avg_price: Decimal,
    pub position_cost: Decimal,
    pub market_value: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub update_time: DateTime<Utc>,
}

impl PositionData {
    /// Create a flat position
    pub fn flat(symbol: impl Into<String>, direction: PositionDirection) -> Self {
        Self {
            symbol: symbol.into(),
            direction,
            total_position: 0,
            today_position: 0,
            yesterday_position: 0,
            avg_price: Decimal::ZERO,
            position_cost: Decimal::ZERO,
            market_value: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            update_time: Utc::now(),
        }
    }

    pub fn is_flat(&self) -> bool {
        self.total_position == 0
    }

    /// Unrealized P&L at `mark_price`
    pub fn pnl_at(&self, mark_price: Decimal) -> Decimal {
        let qty = Decimal::from(self.total_position);
        match self.direction {
            PositionDirection::Long => qty * (mark_price - self.avg_price),
            PositionDirection::Short => qty * (self.avg_price - mark_price),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_affected_side() {
        use PositionDirection::*;
        assert_eq!(PositionDirection::affected_by(Direction::Buy, Offset::Open), Long);
        assert_eq!(PositionDirection::affected_by(Direction::Sell, Offset::Close), Long);
        assert_eq!(PositionDirection::affected_by(Direction::Sell, Offset::Open), Short);
        assert_eq!(PositionDirection::affected_by(Direction::Buy, Offset::CloseToday), Short);
    }

    #[test]
    fn test_short_pnl() {
        let mut p = PositionData::flat("rb2405", PositionDirection::Short);
        p.total_position = 2;
        p.avg_price = dec!(100);
        assert_eq!(p.pnl_at(dec!(95)), dec!(10));
        assert_eq!(p.pnl_at(dec!(101)), dec!(-2));
    }
}
