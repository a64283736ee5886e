//! Tick replay: a MarketDataConnector fed by the caller.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};
use meridian_core::MarketDataField;
use meridian_ports::{ConnectorError, ConnectorResult, MarketDataCallback, MarketDataConnector};
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;

/// Market-data connector that replays recorded or synthetic ticks.
///
/// A tick reaches the callback only while connected and only for
/// subscribed symbols, like a live feed.
#[derive(Default)]
pub struct ReplayMarketDataConnector {
    connected: AtomicBool,
    subscribed: Mutex<BTreeSet<String>>,
    callback: RwLock<Option<MarketDataCallback>>,
}

impl ReplayMarketDataConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver one tick. Returns whether it reached the callback.
    pub fn push(&self, tick: MarketDataField) -> bool {
        if !self.is_connected() || !self.subscribed.lock().contains(&tick.symbol) {
            debug!("[REPLAY] dropping tick for {}", tick.symbol);
            return false;
        }
        match self.callback.read().as_ref() {
            Some(cb) => {
                cb(tick);
                true
            }
            None => false,
        }
    }

    /// Deliver ticks in order; returns how many were delivered.
    pub fn replay<I>(&self, ticks: I) -> usize
    where
        I: IntoIterator<Item = MarketDataField>,
    {
        ticks.into_iter().filter(|tick| self.push(tick.clone())).count()
    }

    /// Replay a last-price series for one symbol.
    pub fn replay_prices(&self, symbol: &str, prices: &[Decimal]) -> usize {
        self.replay(prices.iter().map(|p| MarketDataField::new(symbol, *p)))
    }

    pub fn subscribed(&self) -> Vec<String> {
        self.subscribed.lock().iter().cloned().collect()
    }
}

impl MarketDataConnector for ReplayMarketDataConnector {
    fn init(&self, _config: &str) -> ConnectorResult<()> {
        Ok(())
    }

    fn connect(&self) -> ConnectorResult<()> {
        self.connected.store(true, Ordering::SeqCst);
        info!("[REPLAY] connected");
        Ok(())
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn subscribe(&self, symbols: &[String]) -> ConnectorResult<()> {
        if !self.is_connected() {
            return Err(ConnectorError::NotConnected);
        }
        self.subscribed.lock().extend(symbols.iter().cloned());
        Ok(())
    }

    fn unsubscribe(&self, symbols: &[String]) -> ConnectorResult<()> {
        if !self.is_connected() {
            return Err(ConnectorError::NotConnected);
        }
        let mut subscribed = self.subscribed.lock();
        for symbol in symbols {
            subscribed.remove(symbol);
        }
        Ok(())
    }

    fn set_callback(&self, callback: MarketDataCallback) {
        *self.callback.write() = Some(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    #[test]
    fn test_only_subscribed_symbols_delivered() {
        let feed = ReplayMarketDataConnector::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        feed.set_callback(Arc::new(move |tick: MarketDataField| s.lock().push(tick.symbol)));

        assert!(!feed.push(MarketDataField::new("rb2405", dec!(1))));
        feed.connect().unwrap();
        feed.subscribe(&["rb2405".to_string()]).unwrap();

        let delivered = feed.replay(vec![
            MarketDataField::new("rb2405", dec!(1)),
            MarketDataField::new("cu2405", dec!(2)),
            MarketDataField::new("rb2405", dec!(3)),
        ]);
        assert_eq!(delivered, 2);
        assert_eq!(*seen.lock(), vec!["rb2405", "rb2405"]);
    }

    #[test]
    fn test_subscribe_requires_connection() {
        let feed = ReplayMarketDataConnector::new();
        assert_eq!(
            feed.subscribe(&["rb2405".to_string()]),
            Err(ConnectorError::NotConnected)
        );
        feed.connect().unwrap();
        feed.subscribe(&["rb2405".to_string()]).unwrap();
        feed.unsubscribe(&["rb2405".to_string()]).unwrap();
        assert!(feed.subscribed().is_empty());
    }
}
