//! RiskGate: the admission-control handler.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, info, warn};
use meridian_core::{Event, EventRef, RiskData};
use meridian_ports::{Clock, EventHandler, EventSink, HandlerError, OrderRouter};
use parking_lot::RwLock;

use crate::rules::{RiskDecision, RuleRef, order_intent};

/// Admission counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateStats {
    pub approved: u64,
    pub rejected: u64,
    /// Findings raised on non-order events (e.g. an oversized loss)
    pub alerts: u64,
}

/// Chains risk rules in front of order placement.
///
/// Order intents are checked rule by rule in registration order; the first
/// rejection wins and the remaining rules are not consulted. Every other
/// event is shown to every rule so they can keep their state current.
pub struct RiskGate {
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    rules: RwLock<Vec<RuleRef>>,
    router: RwLock<Option<Arc<dyn OrderRouter>>>,
    approved: AtomicU64,
    rejected: AtomicU64,
    alerts: AtomicU64,
}

impl RiskGate {
    pub fn new(sink: Arc<dyn EventSink>, clock: Arc<dyn Clock>) -> Self {
        Self {
            sink,
            clock,
            rules: RwLock::new(Vec::new()),
            router: RwLock::new(None),
            approved: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            alerts: AtomicU64::new(0),
        }
    }

    pub fn with_router(self, router: Arc<dyn OrderRouter>) -> Self {
        self.set_router(router);
        self
    }

    /// Where approved intents are sent for placement
    pub fn set_router(&self, router: Arc<dyn OrderRouter>) {
        *self.router.write() = Some(router);
    }

    /// Append a rule. A rule with the same name replaces the old one in place.
    pub fn add_rule(&self, rule: RuleRef) {
        let mut rules = self.rules.write();
        match rules.iter().position(|r| r.name() == rule.name()) {
            Some(idx) => {
                warn!("[RISK] replacing rule {}", rule.name());
                rules[idx] = rule;
            }
            None => {
                info!("[RISK] added rule {}", rule.name());
                rules.push(rule);
            }
        }
    }

    pub fn remove_rule(&self, name: &str) -> bool {
        let mut rules = self.rules.write();
        let before = rules.len();
        rules.retain(|r| r.name() != name);
        let removed = rules.len() != before;
        if removed {
            info!("[RISK] removed rule {}", name);
        }
        removed
    }

    /// Rule names in evaluation order
    pub fn rules(&self) -> Vec<String> {
        self.rules.read().iter().map(|r| r.name().to_string()).collect()
    }

    pub fn rule(&self, name: &str) -> Option<RuleRef> {
        self.rules.read().iter().find(|r| r.name() == name).cloned()
    }

    pub fn stats(&self) -> GateStats {
        GateStats {
            approved: self.approved.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            alerts: self.alerts.load(Ordering::Relaxed),
        }
    }

    /// Run `event` through the chain. Returns false when an intent was vetoed.
    pub fn on_event(&self, event: &Event) -> Result<bool, HandlerError> {
        // Snapshot so a rule added mid-dispatch never sees a half-checked event.
        let rules: Vec<RuleRef> = self.rules.read().clone();

        let Some(order) = order_intent(event) else {
            for rule in &rules {
                if let RiskDecision::Rejected(reason) = rule.check(event) {
                    self.alerts.fetch_add(1, Ordering::Relaxed);
                    self.report(rule, event, &reason)?;
                }
            }
            return Ok(true);
        };

        for rule in &rules {
            if let RiskDecision::Rejected(reason) = rule.check(event) {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "[RISK] {} rejected order {} ({} {}): {}",
                    rule.name(),
                    order.order_id,
                    order.strategy_id,
                    order.symbol,
                    reason
                );
                // Both go out even if one publish fails; the first error wins.
                let reported = self.report(rule, event, &reason);
                let echoed = self
                    .sink
                    .publish(Event::order(order.rejected(reason, self.clock.now())));
                reported?;
                echoed?;
                return Ok(false);
            }
        }

        self.approved.fetch_add(1, Ordering::Relaxed);
        debug!("[RISK] order {} passed {} rules", order.order_id, rules.len());
        match self.router.read().as_ref() {
            Some(router) => {
                router.route(order);
            }
            None => warn!("[RISK] no router set, order {} not placed", order.order_id),
        }
        Ok(true)
    }

    fn report(&self, rule: &RuleRef, event: &Event, reason: &str) -> Result<(), HandlerError> {
        let (strategy_id, symbol, order_id) = match (event.as_order(), event.as_trade()) {
            (Some(order), _) => (
                order.strategy_id.clone(),
                order.symbol.clone(),
                Some(order.order_id.clone()),
            ),
            (None, Some(trade)) => (
                trade.strategy_id.clone(),
                trade.symbol.clone(),
                Some(trade.order_id.clone()),
            ),
            (None, None) => (String::new(), String::new(), None),
        };

        let risk = RiskData {
            level: rule.level(),
            risk_type: rule.risk_type(),
            rule: rule.name().to_string(),
            strategy_id,
            symbol,
            order_id,
            message: reason.to_string(),
            trigger_time: self.clock.now(),
        };
        self.sink.publish(Event::risk(risk))?;
        Ok(())
    }
}

impl EventHandler for RiskGate {
    fn name(&self) -> &str {
        "RiskGate"
    }

    fn handle(&self, event: &EventRef) -> Result<(), HandlerError> {
        self.on_event(event).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{OrderFrequencyRule, PositionLimitRule, RiskRule};
    use chrono::Duration;
    use meridian_clock::ManualClock;
    use meridian_core::{
        Direction, EventKind, Offset, OrderData, OrderStatus, RiskType,
    };
    use meridian_ports::PublishError;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;

    #[derive(Default)]
    struct CollectingSink {
        events: Mutex<Vec<EventRef>>,
    }

    impl EventSink for CollectingSink {
        fn publish(&self, event: EventRef) -> Result<(), PublishError> {
            self.events.lock().push(event);
            Ok(())
        }
    }

    /// Sink whose queue is always full for Risk events
    #[derive(Default)]
    struct RiskFullSink {
        events: Mutex<Vec<EventRef>>,
    }

    impl EventSink for RiskFullSink {
        fn publish(&self, event: EventRef) -> Result<(), PublishError> {
            if event.kind() == EventKind::Risk {
                return Err(PublishError::QueueFull {
                    capacity: 1,
                    attempts: 3,
                });
            }
            self.events.lock().push(event);
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingRouter {
        routed: Mutex<Vec<String>>,
    }

    impl OrderRouter for CountingRouter {
        fn route(&self, order: &OrderData) -> bool {
            self.routed.lock().push(order.order_id.clone());
            true
        }
    }

    struct Veto;

    impl RiskRule for Veto {
        fn name(&self) -> &str {
            "Veto"
        }
        fn risk_type(&self) -> RiskType {
            RiskType::PriceLimit
        }
        fn check(&self, event: &Event) -> RiskDecision {
            match order_intent(event) {
                Some(_) => RiskDecision::Rejected("always".into()),
                None => RiskDecision::Approved,
            }
        }
    }

    fn intent(volume: u32) -> EventRef {
        Event::order(
            OrderData::new("rb2405", Direction::Buy, Offset::Open, dec!(3500), volume)
                .with_strategy("ma"),
        )
    }

    fn gate() -> (RiskGate, Arc<CollectingSink>, Arc<CountingRouter>) {
        let sink = Arc::new(CollectingSink::default());
        let router = Arc::new(CountingRouter::default());
        let gate = RiskGate::new(sink.clone(), ManualClock::starting_now())
            .with_router(router.clone());
        (gate, sink, router)
    }

    #[test]
    fn test_pass_routes_order_and_publishes_nothing() {
        let (gate, sink, router) = gate();
        gate.add_rule(Arc::new(PositionLimitRule::new(10, 50)));

        assert!(gate.on_event(&intent(5)).unwrap());
        assert_eq!(router.routed.lock().len(), 1);
        assert!(sink.events.lock().is_empty());
        assert_eq!(gate.stats().approved, 1);
    }

    #[test]
    fn test_rejection_reports_failing_rule_type() {
        let (gate, sink, router) = gate();
        gate.add_rule(Arc::new(OrderFrequencyRule::new(10, Duration::seconds(5))));
        gate.add_rule(Arc::new(PositionLimitRule::new(10, 50)));

        assert!(!gate.on_event(&intent(11)).unwrap());
        assert!(router.routed.lock().is_empty());

        let events = sink.events.lock();
        assert_eq!(events.len(), 2);
        let risk = events[0].as_risk().unwrap();
        assert_eq!(risk.risk_type, RiskType::PositionLimit);
        assert_eq!(risk.rule, "PositionLimitRule");
        assert_eq!(risk.strategy_id, "ma");
        assert_eq!(events[1].kind(), EventKind::Order);
        assert_eq!(events[1].as_order().unwrap().status, OrderStatus::Rejected);
        assert_eq!(gate.stats().rejected, 1);
    }

    #[test]
    fn test_rejected_order_published_when_risk_report_fails() {
        let sink = Arc::new(RiskFullSink::default());
        let router = Arc::new(CountingRouter::default());
        let gate = RiskGate::new(sink.clone(), ManualClock::starting_now())
            .with_router(router.clone());
        gate.add_rule(Arc::new(PositionLimitRule::new(10, 50)));

        assert!(matches!(
            gate.on_event(&intent(11)),
            Err(HandlerError::Publish(PublishError::QueueFull { .. }))
        ));
        let events = sink.events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_order().unwrap().status, OrderStatus::Rejected);
        assert!(router.routed.lock().is_empty());
        assert_eq!(gate.stats().rejected, 1);
    }

    #[test]
    fn test_first_failure_short_circuits() {
        let (gate, sink, _) = gate();
        let limit = Arc::new(OrderFrequencyRule::new(10, Duration::seconds(5)));
        gate.add_rule(Arc::new(Veto));
        gate.add_rule(limit.clone());

        gate.on_event(&intent(1)).unwrap();
        assert_eq!(sink.events.lock()[0].as_risk().unwrap().risk_type, RiskType::PriceLimit);
        assert_eq!(limit.recent_orders("ma"), 0);
    }

    #[test]
    fn test_rejected_echo_is_not_regated() {
        let (gate, sink, router) = gate();
        gate.add_rule(Arc::new(Veto));

        gate.on_event(&intent(1)).unwrap();
        let echo = sink.events.lock()[1].clone();
        assert!(gate.on_event(&echo).unwrap());
        assert_eq!(sink.events.lock().len(), 2);
        assert!(router.routed.lock().is_empty());
    }

    #[test]
    fn test_rule_management() {
        let (gate, _, _) = gate();
        gate.add_rule(Arc::new(OrderFrequencyRule::new(10, Duration::seconds(5))));
        gate.add_rule(Arc::new(PositionLimitRule::new(10, 50)));
        gate.add_rule(Arc::new(PositionLimitRule::new(20, 50)));
        assert_eq!(gate.rules(), vec!["OrderFrequencyRule", "PositionLimitRule"]);
        assert!(gate.rule("PositionLimitRule").is_some());

        assert!(gate.remove_rule("OrderFrequencyRule"));
        assert!(!gate.remove_rule("OrderFrequencyRule"));
        assert_eq!(gate.rules(), vec!["PositionLimitRule"]);
    }
}
