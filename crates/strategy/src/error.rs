use thiserror::Error;

use crate::strategy::StrategyStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyError {
    #[error("Strategy already registered: {0}")]
    Duplicate(String),

    #[error("Strategy not found: {0}")]
    NotFound(String),

    #[error("Strategy {id} cannot {action} while {from}")]
    InvalidTransition {
        id: String,
        from: StrategyStatus,
        action: &'static str,
    },

    #[error("Invalid strategy parameters: {0}")]
    InvalidParams(String),
}

pub type Result<T> = std::result::Result<T, StrategyError>;
