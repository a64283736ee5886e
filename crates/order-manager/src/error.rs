//! Order Manager errors

use meridian_core::OrderTransitionError;
use meridian_ports::ConnectorError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Trade connector not connected")]
    NotConnected,

    #[error("Trade connector not logged in")]
    NotLoggedIn,

    #[error("Unknown order: {0}")]
    UnknownOrder(String),

    #[error("Broker did not take order {0}")]
    PlacementFailed(String),

    #[error(transparent)]
    Transition(#[from] OrderTransitionError),

    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),
}

pub type Result<T> = std::result::Result<T, Error>;
