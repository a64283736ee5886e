//! Level-2 market data snapshot, one per tick.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::values::Volume;

/// Depth published by domestic futures feeds
pub const DEPTH_LEVELS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketDataField {
    pub symbol: String,
    pub exchange: String,
    /// Exchange trading day, `YYYYMMDD`
    pub trading_day: String,
    /// Exchange update time, `HH:MM:SS`
    pub update_time: String,
    pub update_millis: u32,

    pub last_price: Decimal,
    pub open_price: Decimal,
    pub high_price: Decimal,
    pub low_price: Decimal,
    pub close_price: Decimal,
    pub pre_close_price: Decimal,
    /// Limit-up price
    pub upper_limit_price: Decimal,
    /// Limit-down price
    pub lower_limit_price: Decimal,

    pub bid_prices: [Decimal; DEPTH_LEVELS],
    pub bid_volumes: [Volume; DEPTH_LEVELS],
    pub ask_prices: [Decimal; DEPTH_LEVELS],
    pub ask_volumes: [Volume; DEPTH_LEVELS],

    pub volume: u64,
    pub turnover: Decimal,
    pub open_interest: Decimal,
    pub pre_open_interest: Decimal,
}

impl MarketDataField {
    /// Tick carrying only a last price, the minimum strategies need
    pub fn new(symbol: impl Into<String>, last_price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            last_price,
            ..Default::default()
        }
    }

    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = exchange.into();
        self
    }

    pub fn with_top_of_book(
        mut self,
        bid: Decimal,
        bid_volume: Volume,
        ask: Decimal,
        ask_volume: Volume,
    ) -> Self {
        self.bid_prices[0] = bid;
        self.bid_volumes[0] = bid_volume;
        self.ask_prices[0] = ask;
        self.ask_volumes[0] = ask_volume;
        self
    }

    /// Best bid, if the level is populated
    pub fn best_bid(&self) -> Option<Decimal> {
        (self.bid_volumes[0] > 0).then_some(self.bid_prices[0])
    }

    /// Best ask, if the level is populated
    pub fn best_ask(&self) -> Option<Decimal> {
        (self.ask_volumes[0] > 0).then_some(self.ask_prices[0])
    }

    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
            _ => None,
        }
    }

    /// True when the last price sits on either daily limit
    pub fn at_price_limit(&self) -> bool {
        let limits_known = !self.upper_limit_price.is_zero() && !self.lower_limit_price.is_zero();
        limits_known
            && (self.last_price >= self.upper_limit_price
                || self.last_price <= self.lower_limit_price)
    }
}
