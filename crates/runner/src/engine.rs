//! Engine - explicit context object for one trading session
//!
//! Builds every component from an `EngineConfig`, registers the handlers
//! on the bus and drives startup and shutdown in order. Nothing is global:
//! two engines in one process share no state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};
use meridian_bus::{BusStats, EventBus};
use meridian_clock::SystemClock;
use meridian_core::{AccountData, EventKind, PositionData};
use meridian_gateway::{MarketDataCache, MarketDataService};
use meridian_order_manager::OrderPipeline;
use meridian_ports::{Clock, MarketDataConnector, TradeConnector};
use meridian_risk_manager::{GateStats, RiskGate};
use meridian_strategy::{MovingAverageCrossover, StrategyRuntime, StrategyStatus};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};

/// Point-in-time view of a running engine
#[derive(Debug, Clone, Default)]
pub struct EngineReport {
    pub bus: BusStats,
    pub gate: GateStats,
    pub strategies: Vec<(String, Option<StrategyStatus>)>,
    pub positions: Vec<PositionData>,
    pub account: AccountData,
    /// Symbols with at least one cached tick
    pub quoted_symbols: Vec<String>,
}

pub struct Engine {
    config: EngineConfig,
    bus: EventBus,
    clock: Arc<dyn Clock>,
    gate: Arc<RiskGate>,
    runtime: Arc<StrategyRuntime>,
    pipeline: Arc<OrderPipeline>,
    market_data: MarketDataService,
    cache: Arc<MarketDataCache>,
    running: AtomicBool,
}

impl Engine {
    /// Build an engine on the system clock
    pub fn new(
        config: EngineConfig,
        trade: Arc<dyn TradeConnector>,
        md: Arc<dyn MarketDataConnector>,
    ) -> Result<Self> {
        Self::with_clock(config, trade, md, SystemClock::shared())
    }

    pub fn with_clock(
        config: EngineConfig,
        trade: Arc<dyn TradeConnector>,
        md: Arc<dyn MarketDataConnector>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let bus = EventBus::new(config.bus.clone());

        let cache = MarketDataCache::new();
        let runtime = Arc::new(StrategyRuntime::new(Arc::new(bus.publisher())));
        let pipeline = OrderPipeline::new(trade, Arc::new(bus.publisher()), clock.clone());
        let gate = Arc::new(
            RiskGate::new(Arc::new(bus.publisher()), clock.clone()).with_router(pipeline.clone()),
        );
        for rule in config.risk.build_rules(clock.clone()) {
            gate.add_rule(rule);
        }
        let market_data = MarketDataService::new(md, Arc::new(bus.publisher()));

        for (index, params) in config.strategies.iter().enumerate() {
            let id = EngineConfig::strategy_id(index);
            let strategy = MovingAverageCrossover::new(id, params.clone())?;
            runtime.register(Box::new(strategy))?;
        }

        // Registration order fixes per-kind dispatch order.
        bus.register_for(EventKind::MarketData, cache.clone());
        for kind in [EventKind::MarketData, EventKind::Order, EventKind::Trade] {
            bus.register_for(kind, runtime.clone());
        }
        for kind in [EventKind::Order, EventKind::Trade, EventKind::Position] {
            bus.register_for(kind, gate.clone());
        }
        for kind in [EventKind::StrategySignal, EventKind::MarketData, EventKind::Order] {
            bus.register_for(kind, pipeline.clone());
        }

        info!(
            "[ENGINE] built with {} strategies and {} risk rules",
            config.strategies.len(),
            gate.rules().len()
        );

        Ok(Self {
            config,
            bus,
            clock,
            gate,
            runtime,
            pipeline,
            market_data,
            cache,
            running: AtomicBool::new(false),
        })
    }

    /// Start the bus and services, log in, then start the strategies.
    ///
    /// Login precedes the strategies so their first signals find a session.
    /// On failure everything already started is stopped again.
    pub fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(EngineError::AlreadyRunning);
        }
        if let Err(e) = self.try_start() {
            warn!("[ENGINE] startup failed: {}", e);
            self.shutdown();
            self.running.store(false, Ordering::SeqCst);
            return Err(e);
        }
        info!("[ENGINE] started at {}", self.clock.now());
        Ok(())
    }

    fn try_start(&self) -> Result<()> {
        self.bus.start()?;
        self.pipeline.start()?;
        self.market_data.subscribe(&self.config.all_symbols())?;
        self.market_data.start()?;
        self.pipeline
            .login(&self.config.user_id, &self.config.password)?;
        let started = self.runtime.start_all();
        info!("[ENGINE] {} strategies running", started);
        Ok(())
    }

    /// Stop in reverse order. Safe to call more than once.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.shutdown();
            info!("[ENGINE] stopped");
        }
    }

    fn shutdown(&self) {
        self.runtime.stop_all();
        if self.pipeline.is_logged_in() {
            if let Err(e) = self.pipeline.logout() {
                warn!("[ENGINE] logout failed: {}", e);
            }
        }
        self.market_data.stop();
        self.pipeline.stop();
        self.bus.stop();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn report(&self) -> EngineReport {
        EngineReport {
            bus: self.bus.stats(),
            gate: self.gate.stats(),
            strategies: self
                .runtime
                .strategy_ids()
                .into_iter()
                .map(|id| {
                    let status = self.runtime.status(&id);
                    (id, status)
                })
                .collect(),
            positions: self.pipeline.query_positions(),
            account: self.pipeline.query_account(),
            quoted_symbols: self.cache.symbols(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn gate(&self) -> &Arc<RiskGate> {
        &self.gate
    }

    pub fn runtime(&self) -> &Arc<StrategyRuntime> {
        &self.runtime
    }

    pub fn pipeline(&self) -> &Arc<OrderPipeline> {
        &self.pipeline
    }

    pub fn market_data(&self) -> &MarketDataService {
        &self.market_data
    }

    pub fn cache(&self) -> &Arc<MarketDataCache> {
        &self.cache
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_gateway::{PaperTradeConnector, ReplayMarketDataConnector};
    use meridian_strategy::MaCrossoverParams;

    fn engine(config: EngineConfig) -> Result<Engine> {
        Engine::new(
            config,
            Arc::new(PaperTradeConnector::default()),
            Arc::new(ReplayMarketDataConnector::new()),
        )
    }

    #[test]
    fn test_builds_rules_and_strategies() {
        let config = EngineConfig::default()
            .with_strategy(MaCrossoverParams::for_symbol("rb2405"))
            .with_strategy(MaCrossoverParams::for_symbol("cu2405"));
        let engine = engine(config).unwrap();

        assert_eq!(engine.gate().rules().len(), 3);
        assert_eq!(engine.runtime().strategy_ids(), vec!["MA_01", "MA_02"]);
        assert!(!engine.is_running());
        assert_eq!(engine.bus().handler_count(Some(EventKind::MarketData)), 3);
        assert_eq!(engine.bus().handler_count(Some(EventKind::Order)), 3);
    }

    #[test]
    fn test_invalid_strategy_params_fail_build() {
        let config = EngineConfig::default().with_strategy(MaCrossoverParams::default());
        assert!(matches!(engine(config), Err(EngineError::Strategy(_))));
    }

    #[test]
    fn test_failed_login_rolls_back() {
        let config = EngineConfig::default().with_credentials("", "");
        let engine = engine(config).unwrap();

        assert!(matches!(engine.start(), Err(EngineError::Order(_))));
        assert!(!engine.is_running());
        assert!(!engine.bus().is_running());
        assert!(!engine.market_data().is_running());
        assert!(!engine.pipeline().is_connected());
    }

    #[test]
    fn test_start_twice_rejected() {
        let engine = engine(EngineConfig::default()).unwrap();
        engine.start().unwrap();
        assert!(matches!(engine.start(), Err(EngineError::AlreadyRunning)));
        engine.stop();
        engine.stop();
        assert!(!engine.is_running());
    }
}
