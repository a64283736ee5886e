//! Position Tracking and PnL
//!
//! Positions are kept per (symbol, direction), the way futures brokers
//! report them: buying to open and selling to open build separate long and
//! short books. A fill either adds to a book at a volume-weighted price or
//! closes part of the opposite book and realizes P&L against its average.

use std::collections::HashMap;

use log::warn;
use meridian_core::{Offset, PositionData, PositionDirection, Price, TradeData, Volume};
use rust_decimal::Decimal;

/// Outcome of applying one fill
#[derive(Debug, Clone, PartialEq)]
pub struct FillOutcome {
    /// Position after the fill
    pub position: PositionData,
    /// P&L realized by this fill (zero for opening fills)
    pub realized_pnl: Decimal,
}

/// Local position book, fed by trade callbacks
#[derive(Debug, Default)]
pub struct PositionBook {
    positions: HashMap<(String, PositionDirection), PositionData>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a fill to the book it affects
    pub fn apply_trade(&mut self, trade: &TradeData) -> FillOutcome {
        let direction = PositionDirection::affected_by(trade.direction, trade.offset);
        let position = self
            .positions
            .entry((trade.symbol.clone(), direction))
            .or_insert_with(|| PositionData::flat(trade.symbol.clone(), direction));

        let realized_pnl = if trade.offset == Offset::Open {
            Self::open(position, trade.volume, trade.price);
            Decimal::ZERO
        } else {
            Self::close(position, trade.offset, trade.volume, trade.price)
        };

        position.realized_pnl += realized_pnl;
        Self::mark_position(position, trade.price);
        position.update_time = trade.trade_time;

        FillOutcome {
            position: position.clone(),
            realized_pnl,
        }
    }

    fn open(position: &mut PositionData, volume: Volume, price: Price) {
        let held = Decimal::from(position.total_position);
        let added = Decimal::from(volume);
        let new_total = position.total_position + volume;

        // Adding to position - weighted average
        position.avg_price = (held * position.avg_price + added * price) / Decimal::from(new_total);
        position.total_position = new_total;
        position.today_position += volume;
        position.position_cost = position.avg_price * Decimal::from(new_total);
    }

    fn close(position: &mut PositionData, offset: Offset, volume: Volume, price: Price) -> Decimal {
        let closed = volume.min(position.total_position);
        if closed < volume {
            warn!(
                "[ORDER] closing {} {:?} x{} but only {} held",
                position.symbol, position.direction, volume, position.total_position
            );
        }

        let qty = Decimal::from(closed);
        let realized = match position.direction {
            PositionDirection::Long => qty * (price - position.avg_price),
            PositionDirection::Short => qty * (position.avg_price - price),
        };

        // Close-today and close-yesterday pick the bucket; plain close
        // consumes yesterday's volume first.
        let from_today = match offset {
            Offset::CloseToday => closed.min(position.today_position),
            _ => closed.saturating_sub(position.yesterday_position),
        };
        let from_today = from_today.min(position.today_position);
        position.today_position -= from_today;
        position.yesterday_position = position
            .yesterday_position
            .saturating_sub(closed - from_today);

        position.total_position -= closed;
        if position.total_position == 0 {
            // Flat, reset avg price
            position.avg_price = Decimal::ZERO;
        }
        position.position_cost = position.avg_price * Decimal::from(position.total_position);
        realized
    }

    fn mark_position(position: &mut PositionData, mark: Price) {
        position.market_value = mark * Decimal::from(position.total_position);
        position.unrealized_pnl = position.pnl_at(mark);
    }

    /// Re-mark both books of `symbol` at `price`
    pub fn mark(&mut self, symbol: &str, price: Price) {
        for ((s, _), position) in self.positions.iter_mut() {
            if s == symbol {
                Self::mark_position(position, price);
            }
        }
    }

    /// Start a trading day: today's volume becomes yesterday's
    pub fn roll_day(&mut self) {
        for position in self.positions.values_mut() {
            position.yesterday_position = position.total_position;
            position.today_position = 0;
        }
    }

    pub fn get(&self, symbol: &str, direction: PositionDirection) -> Option<&PositionData> {
        self.positions.get(&(symbol.to_string(), direction))
    }

    /// Long minus short volume
    pub fn net_position(&self, symbol: &str) -> i64 {
        let held = |d| self.get(symbol, d).map_or(0, |p| i64::from(p.total_position));
        held(PositionDirection::Long) - held(PositionDirection::Short)
    }

    pub fn positions(&self) -> Vec<PositionData> {
        self.positions.values().cloned().collect()
    }

    pub fn total_realized_pnl(&self) -> Decimal {
        self.positions.values().map(|p| p.realized_pnl).sum()
    }

    pub fn total_unrealized_pnl(&self) -> Decimal {
        self.positions.values().map(|p| p.unrealized_pnl).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use meridian_core::Direction;
    use rust_decimal_macros::dec;

    fn trade(direction: Direction, offset: Offset, price: Decimal, volume: Volume) -> TradeData {
        TradeData::new("T", "O", "rb2405", direction, offset, price, volume, Utc::now())
    }

    #[test]
    fn test_open_long_position() {
        let mut book = PositionBook::new();
        let out = book.apply_trade(&trade(Direction::Buy, Offset::Open, dec!(100), 2));

        assert_eq!(out.realized_pnl, dec!(0));
        assert_eq!(out.position.direction, PositionDirection::Long);
        assert_eq!(out.position.total_position, 2);
        assert_eq!(out.position.avg_price, dec!(100));
        assert_eq!(book.net_position("rb2405"), 2);
    }

    #[test]
    fn test_add_to_position_weighted_average() {
        let mut book = PositionBook::new();
        book.apply_trade(&trade(Direction::Buy, Offset::Open, dec!(100), 1));
        let out = book.apply_trade(&trade(Direction::Buy, Offset::Open, dec!(110), 3));

        assert_eq!(out.position.total_position, 4);
        assert_eq!(out.position.avg_price, dec!(107.5));
        assert_eq!(out.position.position_cost, dec!(430));
    }

    #[test]
    fn test_close_long_realizes_pnl() {
        let mut book = PositionBook::new();
        book.apply_trade(&trade(Direction::Buy, Offset::Open, dec!(100), 2));
        let out = book.apply_trade(&trade(Direction::Sell, Offset::Close, dec!(105), 1));

        assert_eq!(out.realized_pnl, dec!(5));
        assert_eq!(out.position.total_position, 1);
        assert_eq!(out.position.avg_price, dec!(100));

        let out = book.apply_trade(&trade(Direction::Sell, Offset::Close, dec!(98), 1));
        assert_eq!(out.realized_pnl, dec!(-2));
        assert!(out.position.is_flat());
        assert_eq!(out.position.avg_price, dec!(0));
        assert_eq!(book.total_realized_pnl(), dec!(3));
    }

    #[test]
    fn test_long_and_short_books_are_separate() {
        let mut book = PositionBook::new();
        book.apply_trade(&trade(Direction::Buy, Offset::Open, dec!(100), 3));
        book.apply_trade(&trade(Direction::Sell, Offset::Open, dec!(102), 1));

        assert_eq!(book.get("rb2405", PositionDirection::Long).unwrap().total_position, 3);
        assert_eq!(book.get("rb2405", PositionDirection::Short).unwrap().total_position, 1);
        assert_eq!(book.net_position("rb2405"), 2);

        let out = book.apply_trade(&trade(Direction::Buy, Offset::Close, dec!(99), 1));
        assert_eq!(out.position.direction, PositionDirection::Short);
        assert_eq!(out.realized_pnl, dec!(3));
    }

    #[test]
    fn test_close_today_and_yesterday_buckets() {
        let mut book = PositionBook::new();
        book.apply_trade(&trade(Direction::Buy, Offset::Open, dec!(100), 2));
        book.roll_day();
        book.apply_trade(&trade(Direction::Buy, Offset::Open, dec!(100), 3));

        let p = book.apply_trade(&trade(Direction::Sell, Offset::CloseToday, dec!(100), 1)).position;
        assert_eq!((p.yesterday_position, p.today_position), (2, 2));

        let p = book.apply_trade(&trade(Direction::Sell, Offset::Close, dec!(100), 3)).position;
        assert_eq!((p.yesterday_position, p.today_position), (0, 1));
        assert_eq!(p.total_position, 1);
    }

    #[test]
    fn test_overclose_is_clamped() {
        let mut book = PositionBook::new();
        book.apply_trade(&trade(Direction::Buy, Offset::Open, dec!(100), 1));
        let out = book.apply_trade(&trade(Direction::Sell, Offset::Close, dec!(110), 5));
        assert_eq!(out.realized_pnl, dec!(10));
        assert!(out.position.is_flat());
    }

    #[test]
    fn test_mark_updates_unrealized() {
        let mut book = PositionBook::new();
        book.apply_trade(&trade(Direction::Sell, Offset::Open, dec!(100), 2));
        book.mark("rb2405", dec!(97));

        let short = book.get("rb2405", PositionDirection::Short).unwrap();
        assert_eq!(short.unrealized_pnl, dec!(6));
        assert_eq!(short.market_value, dec!(194));
        assert_eq!(book.total_unrealized_pnl(), dec!(6));
    }
}
