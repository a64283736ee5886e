//! StrategyRuntime: strategy registry and bus handler.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::{error, info, warn};
use meridian_core::{Event, EventPayload, EventRef, StrategySignalData};
use meridian_ports::{EventHandler, EventSink, HandlerError};
use parking_lot::Mutex;

use crate::error::{Result, StrategyError};
use crate::strategy::{Strategy, StrategyStatus};

type SharedStrategy = Arc<Mutex<Box<dyn Strategy>>>;

struct Slot {
    status: StrategyStatus,
    strategy: SharedStrategy,
}

/// Owns registered strategies and drives them from the bus.
///
/// Market data goes to every Running strategy; order and trade updates go
/// only to the Running strategy that owns them. Signals the strategies
/// return are published as StrategySignal events.
pub struct StrategyRuntime {
    sink: Arc<dyn EventSink>,
    strategies: Mutex<BTreeMap<String, Slot>>,
}

impl StrategyRuntime {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            strategies: Mutex::new(BTreeMap::new()),
        }
    }

    /// Add a strategy in the Stopped state.
    pub fn register(&self, strategy: Box<dyn Strategy>) -> Result<()> {
        let id = strategy.id().to_string();
        let mut strategies = self.strategies.lock();
        if strategies.contains_key(&id) {
            return Err(StrategyError::Duplicate(id));
        }
        info!("[STRATEGY] registered {} ({})", id, strategy.name());
        strategies.insert(
            id,
            Slot {
                status: StrategyStatus::Stopped,
                strategy: Arc::new(Mutex::new(strategy)),
            },
        );
        Ok(())
    }

    /// Stop (if needed) and remove a strategy.
    pub fn unregister(&self, id: &str) -> Result<()> {
        let slot = self
            .strategies
            .lock()
            .remove(id)
            .ok_or_else(|| StrategyError::NotFound(id.to_string()))?;
        if slot.status.is_active() {
            slot.strategy.lock().on_stop();
        }
        info!("[STRATEGY] unregistered {}", id);
        Ok(())
    }

    /// Start a Stopped strategy.
    ///
    /// The strategy stays locked from before it turns Running until
    /// `on_start` returns, so dispatch never reaches it with pre-stop state.
    pub fn start(&self, id: &str) -> Result<()> {
        let strategy = self
            .strategies
            .lock()
            .get(id)
            .map(|slot| Arc::clone(&slot.strategy))
            .ok_or_else(|| StrategyError::NotFound(id.to_string()))?;
        let mut guard = strategy.lock();
        self.transition(id, "start", |from| {
            (from == StrategyStatus::Stopped).then_some(StrategyStatus::Running)
        })?;
        guard.on_start();
        Ok(())
    }

    pub fn stop(&self, id: &str) -> Result<()> {
        let strategy = self.transition(id, "stop", |from| {
            from.is_active().then_some(StrategyStatus::Stopped)
        })?;
        strategy.lock().on_stop();
        Ok(())
    }

    pub fn pause(&self, id: &str) -> Result<()> {
        self.transition(id, "pause", |from| {
            (from == StrategyStatus::Running).then_some(StrategyStatus::Paused)
        })
        .map(|_| ())
    }

    pub fn resume(&self, id: &str) -> Result<()> {
        self.transition(id, "resume", |from| {
            (from == StrategyStatus::Paused).then_some(StrategyStatus::Running)
        })
        .map(|_| ())
    }

    pub fn status(&self, id: &str) -> Option<StrategyStatus> {
        self.strategies.lock().get(id).map(|slot| slot.status)
    }

    pub fn strategy_ids(&self) -> Vec<String> {
        self.strategies.lock().keys().cloned().collect()
    }

    /// Start every Stopped strategy. Returns how many were started.
    pub fn start_all(&self) -> usize {
        self.strategy_ids()
            .iter()
            .filter(|id| self.status(id) == Some(StrategyStatus::Stopped))
            .filter(|id| self.start(id).is_ok())
            .count()
    }

    /// Stop every Running or Paused strategy. Returns how many were stopped.
    pub fn stop_all(&self) -> usize {
        self.strategy_ids()
            .iter()
            .filter(|id| self.status(id).is_some_and(|s| s.is_active()))
            .filter(|id| self.stop(id).is_ok())
            .count()
    }

    fn transition(
        &self,
        id: &str,
        action: &'static str,
        next: impl FnOnce(StrategyStatus) -> Option<StrategyStatus>,
    ) -> Result<SharedStrategy> {
        let mut strategies = self.strategies.lock();
        let slot = strategies
            .get_mut(id)
            .ok_or_else(|| StrategyError::NotFound(id.to_string()))?;
        let from = slot.status;
        let to = next(from).ok_or_else(|| StrategyError::InvalidTransition {
            id: id.to_string(),
            from,
            action,
        })?;
        slot.status = to;
        info!("[STRATEGY] {}: {} -> {}", id, from, to);
        Ok(Arc::clone(&slot.strategy))
    }

    fn running(&self) -> Vec<(String, SharedStrategy)> {
        self.strategies
            .lock()
            .iter()
            .filter(|(_, slot)| slot.status == StrategyStatus::Running)
            .map(|(id, slot)| (id.clone(), Arc::clone(&slot.strategy)))
            .collect()
    }

    fn running_owner(&self, id: &str) -> Option<SharedStrategy> {
        self.strategies
            .lock()
            .get(id)
            .filter(|slot| slot.status == StrategyStatus::Running)
            .map(|slot| Arc::clone(&slot.strategy))
    }

    /// Run one callback with the registry unlocked; a panicking strategy is
    /// logged and yields no signals.
    fn invoke<F>(id: &str, strategy: &SharedStrategy, callback: F) -> Vec<StrategySignalData>
    where
        F: FnOnce(&mut dyn Strategy) -> Vec<StrategySignalData>,
    {
        let mut guard = strategy.lock();
        match panic::catch_unwind(AssertUnwindSafe(|| callback(guard.as_mut()))) {
            Ok(signals) => signals,
            Err(_) => {
                error!("[STRATEGY] {} panicked in callback", id);
                Vec::new()
            }
        }
    }

    fn publish_all(&self, signals: Vec<StrategySignalData>) -> std::result::Result<(), HandlerError> {
        let mut result = Ok(());
        for signal in signals {
            if let Err(e) = self.sink.publish(Event::signal(signal)) {
                warn!("[STRATEGY] failed to publish signal: {}", e);
                result = Err(e.into());
            }
        }
        result
    }
}

impl EventHandler for StrategyRuntime {
    fn name(&self) -> &str {
        "StrategyRuntime"
    }

    fn handle(&self, event: &EventRef) -> std::result::Result<(), HandlerError> {
        let signals = match event.payload() {
            EventPayload::MarketData(tick) => {
                let at = event.timestamp();
                self.running()
                    .iter()
                    .flat_map(|(id, strategy)| {
                        Self::invoke(id, strategy, |s| s.on_market_data(tick, at))
                    })
                    .collect()
            }
            EventPayload::Order(order) => match self.running_owner(&order.strategy_id) {
                Some(strategy) => Self::invoke(&order.strategy_id, &strategy, |s| s.on_order(order)),
                None => Vec::new(),
            },
            EventPayload::Trade(trade) => match self.running_owner(&trade.strategy_id) {
                Some(strategy) => Self::invoke(&trade.strategy_id, &strategy, |s| s.on_trade(trade)),
                None => Vec::new(),
            },
            _ => Vec::new(),
        };
        self.publish_all(signals)
    }
}
