//! Error types for the engine context

use meridian_bus::BusError;
use meridian_gateway::GatewayError;
use meridian_strategy::StrategyError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Order error: {0}")]
    Order(#[from] meridian_order_manager::Error),

    #[error("Market data error: {0}")]
    MarketData(#[from] GatewayError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Engine already running")]
    AlreadyRunning,
}

pub type Result<T> = std::result::Result<T, EngineError>;
