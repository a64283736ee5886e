//! Error types for the gateway crate

use meridian_ports::ConnectorError;
use thiserror::Error;

/// Gateway-level errors (service operations)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Service not running")]
    NotRunning,

    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
