//! Moving Average Crossover Strategy
//!
//! Trend follower on a single symbol:
//! - Keeps the last `long_period` prices
//! - Recomputes short and long simple averages each tick once the series is full
//! - Golden cross (short crosses above long) opens long
//! - Death cross (short crosses below long) opens short
//! - Never repeats a signal in the direction it already holds

use std::collections::VecDeque;

use log::info;
use meridian_core::{MarketDataField, SignalType, StrategySignalData, Timestamp, Volume};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StrategyError};
use crate::strategy::Strategy;

/// Configuration for the crossover strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaCrossoverParams {
    /// Contract to trade
    pub symbol: String,
    pub short_period: usize,
    pub long_period: usize,
    /// Volume carried on each signal
    pub volume: Volume,
    /// Stop distance as a fraction of the entry price
    pub stop_loss_pct: Decimal,
    /// Target distance as a fraction of the entry price
    pub take_profit_pct: Decimal,
}

impl Default for MaCrossoverParams {
    fn default() -> Self {
        Self {
            symbol: String::new(),
            short_period: 5,
            long_period: 20,
            volume: 1,
            stop_loss_pct: dec!(0.02),  // 2% stop
            take_profit_pct: dec!(0.05), // 5% target
        }
    }
}

impl MaCrossoverParams {
    pub fn for_symbol(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    pub fn with_periods(mut self, short_period: usize, long_period: usize) -> Self {
        self.short_period = short_period;
        self.long_period = long_period;
        self
    }

    pub fn with_volume(mut self, volume: Volume) -> Self {
        self.volume = volume;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.symbol.is_empty() {
            return Err(StrategyError::InvalidParams("symbol is empty".into()));
        }
        if self.short_period == 0 || self.short_period >= self.long_period {
            return Err(StrategyError::InvalidParams(format!(
                "need 0 < short_period < long_period, got {} / {}",
                self.short_period, self.long_period
            )));
        }
        if self.volume == 0 {
            return Err(StrategyError::InvalidParams("volume is zero".into()));
        }
        Ok(())
    }
}

/// Simple moving-average crossover
pub struct MovingAverageCrossover {
    id: String,
    params: MaCrossoverParams,
    prices: VecDeque<Decimal>,
    /// Last two (short, long) average pairs, oldest first
    averages: VecDeque<(Decimal, Decimal)>,
    /// +1 long, -1 short, 0 flat
    last_signal: i8,
}

impl MovingAverageCrossover {
    pub fn new(id: impl Into<String>, params: MaCrossoverParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            id: id.into(),
            prices: VecDeque::with_capacity(params.long_period),
            averages: VecDeque::with_capacity(2),
            params,
            last_signal: 0,
        })
    }

    pub fn params(&self) -> &MaCrossoverParams {
        &self.params
    }

    /// Latest (short, long) averages, once the series is full
    pub fn averages(&self) -> Option<(Decimal, Decimal)> {
        self.averages.back().copied()
    }

    pub fn last_signal(&self) -> i8 {
        self.last_signal
    }

    fn reset(&mut self) {
        self.prices.clear();
        self.averages.clear();
        self.last_signal = 0;
    }

    fn mean(values: impl Iterator<Item = Decimal>, n: usize) -> Decimal {
        values.sum::<Decimal>() / Decimal::from(n)
    }

    fn signal(
        &self,
        signal_type: SignalType,
        tick: &MarketDataField,
        at: Timestamp,
    ) -> StrategySignalData {
        let price = tick.last_price;
        let (sl, tp) = (self.params.stop_loss_pct, self.params.take_profit_pct);
        let (stop_loss, take_profit, comment) = match signal_type {
            SignalType::OpenLong => (
                price * (Decimal::ONE - sl),
                price * (Decimal::ONE + tp),
                "MA crossover: short MA crossed above long MA",
            ),
            _ => (
                price * (Decimal::ONE + sl),
                price * (Decimal::ONE - tp),
                "MA crossunder: short MA crossed below long MA",
            ),
        };

        StrategySignalData {
            strategy_id: self.id.clone(),
            symbol: tick.symbol.clone(),
            signal_type,
            price,
            volume: self.params.volume,
            stop_loss,
            take_profit,
            signal_time: at,
            comment: comment.to_string(),
        }
    }
}

impl Strategy for MovingAverageCrossover {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "MovingAverageCrossover"
    }

    fn on_start(&mut self) {
        // Never cross on history from before the last stop.
        self.reset();
    }

    fn on_market_data(&mut self, tick: &MarketDataField, at: Timestamp) -> Vec<StrategySignalData> {
        if tick.symbol != self.params.symbol {
            return Vec::new();
        }

        let long = self.params.long_period;
        let short = self.params.short_period;

        self.prices.push_back(tick.last_price);
        if self.prices.len() > long {
            self.prices.pop_front();
        }
        if self.prices.len() < long {
            return Vec::new();
        }

        let short_ma = Self::mean(self.prices.iter().skip(long - short).copied(), short);
        let long_ma = Self::mean(self.prices.iter().copied(), long);
        self.averages.push_back((short_ma, long_ma));
        if self.averages.len() > 2 {
            self.averages.pop_front();
        }

        if self.averages.len() < 2 {
            return Vec::new();
        }
        let (prev_short, prev_long) = self.averages[0];
        let (cur_short, cur_long) = self.averages[1];

        let golden = prev_short <= prev_long && cur_short > cur_long;
        let death = prev_short >= prev_long && cur_short < cur_long;
        let signal_type = if golden && self.last_signal <= 0 {
            SignalType::OpenLong
        } else if death && self.last_signal >= 0 {
            SignalType::OpenShort
        } else {
            return Vec::new();
        };

        self.last_signal = signal_type.exposure();
        info!(
            "[STRATEGY] {} {:?} {} @ {} (short={}, long={})",
            self.id, signal_type, tick.symbol, tick.last_price, cur_short, cur_long
        );
        vec![self.signal(signal_type, tick, at)]
    }
}
