//! Risk rules
//!
//! A rule is a named, stateful predicate over the event stream. The gate
//! asks every rule about every event it receives; rules ignore the kinds
//! they do not care about by returning `Approved`.

mod frequency;
mod loss_limit;
mod position_limit;

pub use frequency::OrderFrequencyRule;
pub use loss_limit::LossLimitRule;
pub use position_limit::PositionLimitRule;

use std::sync::Arc;

use meridian_core::{Event, OrderData, OrderStatus, RiskLevel, RiskType};

/// Outcome of one rule check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RiskDecision {
    Approved,
    /// Rejected with a human-readable reason
    Rejected(String),
}

impl RiskDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, RiskDecision::Approved)
    }
}

pub trait RiskRule: Send + Sync {
    fn name(&self) -> &str;

    /// Classification attached to Risk events raised by this rule
    fn risk_type(&self) -> RiskType;

    /// Severity attached to Risk events raised by this rule
    fn level(&self) -> RiskLevel {
        RiskLevel::Warning
    }

    /// Inspect (and possibly record) one event.
    fn check(&self, event: &Event) -> RiskDecision;
}

pub type RuleRef = Arc<dyn RiskRule>;

/// The order carried by `event` if it is an intent awaiting admission.
///
/// Broker acknowledgements, fills and forced rejections are order updates,
/// not intents, and never count against a rule.
pub(crate) fn order_intent(event: &Event) -> Option<&OrderData> {
    event
        .as_order()
        .filter(|order| order.status == OrderStatus::Submitting)
}
