mod event;
mod risk;
mod signal;
mod system;

pub use event::{Event, EventKind, EventPayload, EventRef};
pub use risk::{RiskData, RiskLevel, RiskType};
pub use signal::{SignalType, StrategySignalData};
pub use system::{SystemEventData, SystemEventType};
