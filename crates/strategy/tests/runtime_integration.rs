//! Integration tests: StrategyRuntime on a live EventBus
//!
//! Ticks go in through the bus, the moving-average strategy reacts, and the
//! resulting StrategySignal events come back out through the bus.

use std::sync::Arc;
use std::time::Duration;

use meridian_bus::{EventBus, EventRecorder};
use meridian_core::{Event, EventKind, MarketDataField, SignalType};
use meridian_strategy::{MaCrossoverParams, MovingAverageCrossover, StrategyRuntime, StrategyStatus};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const WAIT: Duration = Duration::from_secs(5);

fn setup() -> (EventBus, Arc<StrategyRuntime>, Arc<EventRecorder>, Arc<EventRecorder>) {
    let bus = EventBus::default();
    let runtime = Arc::new(StrategyRuntime::new(Arc::new(bus.publisher())));
    for kind in [EventKind::MarketData, EventKind::Order, EventKind::Trade] {
        bus.register_for(kind, runtime.clone());
    }
    let signals = EventRecorder::new("signal-tap");
    let ticks = EventRecorder::new("tick-tap");
    bus.register_for(EventKind::StrategySignal, signals.clone());
    bus.register_for(EventKind::MarketData, ticks.clone());
    bus.start().unwrap();
    (bus, runtime, signals, ticks)
}

fn publish_prices(bus: &EventBus, symbol: &str, prices: &[Decimal]) {
    for price in prices {
        bus.publish(Event::market_data(MarketDataField::new(symbol, *price)))
            .unwrap();
    }
}

#[test]
fn test_crossover_signal_published_on_bus() {
    let _ = env_logger::try_init();

    let (bus, runtime, signals, ticks) = setup();
    let strategy =
        MovingAverageCrossover::new("ma-rb", MaCrossoverParams::for_symbol("rb2405")).unwrap();
    runtime.register(Box::new(strategy)).unwrap();
    runtime.start("ma-rb").unwrap();

    let mut prices = vec![dec!(100); 20];
    prices.extend((1..=20).map(|i| Decimal::from(100 + i)));
    publish_prices(&bus, "rb2405", &prices);

    assert!(ticks.wait_until(WAIT, |events| events.len() == prices.len()));
    assert!(signals.wait_until(WAIT, |events| !events.is_empty()));

    let published = signals.events();
    assert_eq!(published.len(), 1);
    let signal = published[0].as_signal().unwrap();
    assert_eq!(signal.signal_type, SignalType::OpenLong);
    assert_eq!(signal.strategy_id, "ma-rb");
    assert_eq!(signal.symbol, "rb2405");

    bus.stop();
}

#[test]
fn test_paused_strategy_keeps_series_and_misses_ticks() {
    let _ = env_logger::try_init();

    let (bus, runtime, signals, ticks) = setup();
    let strategy =
        MovingAverageCrossover::new("ma-rb", MaCrossoverParams::for_symbol("rb2405")).unwrap();
    runtime.register(Box::new(strategy)).unwrap();
    runtime.start("ma-rb").unwrap();

    publish_prices(&bus, "rb2405", &[dec!(100); 20]);
    assert!(ticks.wait_until(WAIT, |events| events.len() == 20));

    runtime.pause("ma-rb").unwrap();
    publish_prices(&bus, "rb2405", &[dec!(90)]);
    assert!(ticks.wait_until(WAIT, |events| events.len() == 21));
    assert!(signals.is_empty());

    // Resumed on the retained flat series: one drop crosses immediately.
    runtime.resume("ma-rb").unwrap();
    assert_eq!(runtime.status("ma-rb"), Some(StrategyStatus::Running));
    publish_prices(&bus, "rb2405", &[dec!(100), dec!(95)]);
    assert!(signals.wait_until(WAIT, |events| events.len() == 1));
    assert_eq!(
        signals.events()[0].as_signal().map(|s| s.signal_type),
        Some(SignalType::OpenShort)
    );

    bus.stop();
}

#[test]
fn test_restart_discards_stale_history() {
    let _ = env_logger::try_init();

    let (bus, runtime, signals, ticks) = setup();
    let strategy =
        MovingAverageCrossover::new("ma-rb", MaCrossoverParams::for_symbol("rb2405")).unwrap();
    runtime.register(Box::new(strategy)).unwrap();
    runtime.start("ma-rb").unwrap();

    publish_prices(&bus, "rb2405", &[dec!(100); 20]);
    assert!(ticks.wait_until(WAIT, |events| events.len() == 20));
    runtime.stop("ma-rb").unwrap();
    runtime.start("ma-rb").unwrap();

    // 19 ticks after restart cannot fill a 20-tick window.
    let mut prices = vec![dec!(100); 18];
    prices.push(dec!(80));
    publish_prices(&bus, "rb2405", &prices);
    assert!(ticks.wait_until(WAIT, |events| events.len() == 39));
    assert!(signals.is_empty());

    bus.stop();
}
