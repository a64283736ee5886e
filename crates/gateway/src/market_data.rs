//! Market-data service and the latest-tick cache.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;
use log::{debug, info, warn};
use meridian_core::{Event, EventRef, MarketDataField};
use meridian_ports::{EventHandler, EventSink, HandlerError, MarketDataConnector};
use parking_lot::Mutex;

use crate::error::{GatewayError, Result};

/// Turns connector ticks into MarketData events and owns the subscription set.
///
/// The tracked set survives reconnects: `start` resubscribes everything
/// that was subscribed before the last `stop`.
pub struct MarketDataService {
    connector: Arc<dyn MarketDataConnector>,
    symbols: Mutex<BTreeSet<String>>,
    running: AtomicBool,
    ticks: Arc<AtomicU64>,
}

impl MarketDataService {
    pub fn new(connector: Arc<dyn MarketDataConnector>, sink: Arc<dyn EventSink>) -> Self {
        let ticks = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&ticks);
        connector.set_callback(Arc::new(move |tick: MarketDataField| {
            counter.fetch_add(1, Ordering::Relaxed);
            let symbol = tick.symbol.clone();
            if let Err(e) = sink.publish(Event::market_data(tick)) {
                warn!("[MD] tick for {} dropped: {}", symbol, e);
            }
        }));

        Self {
            connector,
            symbols: Mutex::new(BTreeSet::new()),
            running: AtomicBool::new(false),
            ticks,
        }
    }

    /// Connect and restore the tracked subscriptions.
    ///
    /// A failed resubscribe is logged; the service still runs.
    pub fn start(&self) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.connector.connect()?;
        self.running.store(true, Ordering::SeqCst);

        let symbols = self.subscribed_symbols();
        if !symbols.is_empty() {
            if let Err(e) = self.connector.subscribe(&symbols) {
                warn!("[MD] resubscribe of {} symbols failed: {}", symbols.len(), e);
            }
        }
        info!("[MD] started with {} symbols", symbols.len());
        Ok(())
    }

    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.connector.disconnect();
            info!("[MD] stopped after {} ticks", self.tick_count());
        }
    }

    /// Subscribe to symbols not already tracked.
    ///
    /// While stopped the symbols are only tracked and go out on the next `start`.
    pub fn subscribe(&self, symbols: &[String]) -> Result<()> {
        if let Some(bad) = symbols.iter().find(|s| s.trim().is_empty()) {
            return Err(GatewayError::InvalidSymbol(bad.clone()));
        }
        let fresh: Vec<String> = {
            let tracked = self.symbols.lock();
            symbols
                .iter()
                .filter(|s| !tracked.contains(*s))
                .cloned()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        };
        if fresh.is_empty() {
            return Ok(());
        }

        if self.is_running() {
            self.connector.subscribe(&fresh)?;
        }
        debug!("[MD] subscribed {:?}", fresh);
        self.symbols.lock().extend(fresh);
        Ok(())
    }

    /// Drop tracked symbols. Unknown symbols are ignored.
    pub fn unsubscribe(&self, symbols: &[String]) -> Result<()> {
        let known: Vec<String> = {
            let tracked = self.symbols.lock();
            symbols.iter().filter(|s| tracked.contains(*s)).cloned().collect()
        };
        if known.is_empty() {
            return Ok(());
        }

        if self.is_running() {
            self.connector.unsubscribe(&known)?;
        }
        let mut tracked = self.symbols.lock();
        for symbol in &known {
            tracked.remove(symbol);
        }
        Ok(())
    }

    pub fn subscribed_symbols(&self) -> Vec<String> {
        self.symbols.lock().iter().cloned().collect()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ticks received from the connector since construction
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }
}

impl Drop for MarketDataService {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Latest tick per symbol, fed from MarketData events
#[derive(Default)]
pub struct MarketDataCache {
    latest: DashMap<String, MarketDataField>,
}

impl MarketDataCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn latest(&self, symbol: &str) -> Option<MarketDataField> {
        self.latest.get(symbol).map(|entry| entry.value().clone())
    }

    pub fn has(&self, symbol: &str) -> bool {
        self.latest.contains_key(symbol)
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<_> = self.latest.iter().map(|e| e.key().clone()).collect();
        symbols.sort();
        symbols
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}

impl EventHandler for MarketDataCache {
    fn name(&self) -> &str {
        "MarketDataCache"
    }

    fn handle(&self, event: &EventRef) -> std::result::Result<(), HandlerError> {
        match event.as_market_data() {
            Some(tick) => {
                self.latest.insert(tick.symbol.clone(), tick.clone());
                Ok(())
            }
            None => Err(HandlerError::UnexpectedEvent(format!("{:?}", event.kind()))),
        }
    }
}
