use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::values::{Timestamp, Volume};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalType {
    OpenLong,
    CloseLong,
    OpenShort,
    CloseShort,
}

impl SignalType {
    pub fn is_open(&self) -> bool {
        matches!(self, SignalType::OpenLong | SignalType::OpenShort)
    }

    /// Market exposure after the signal executes: +1 long, -1 short, 0 flat
    pub fn exposure(&self) -> i8 {
        match self {
            SignalType::OpenLong => 1,
            SignalType::OpenShort => -1,
            SignalType::CloseLong | SignalType::CloseShort => 0,
        }
    }
}

/// A strategy's trade intent, distinct from a placed order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySignalData {
    pub strategy_id: String,
    pub symbol: String,
    pub signal_type: SignalType,
    pub price: Decimal,
    pub volume: Volume,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub signal_time: Timestamp,
    pub comment: String,
}
