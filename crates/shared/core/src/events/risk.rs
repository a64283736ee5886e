use serde::{Deserialize, Serialize};

use crate::values::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Info,
    Warning,
    Error,
    Critical,
}

/// Classification of a risk finding, one per rule family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskType {
    PositionLimit,
    OrderFrequencyLimit,
    LossLimit,
    MarginLimit,
    PriceLimit,
    SystemError,
}

/// Payload of a Risk event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskData {
    pub level: RiskLevel,
    pub risk_type: RiskType,
    /// Name of the rule that fired
    pub rule: String,
    pub strategy_id: String,
    pub symbol: String,
    /// Order the finding refers to, when it refers to one
    pub order_id: Option<String>,
    pub message: String,
    pub trigger_time: Timestamp,
}
