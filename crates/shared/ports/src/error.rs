use thiserror::Error;

/// Errors surfaced by market-data and trade connectors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectorError {
    #[error("Connector not initialized")]
    NotInitialized,

    #[error("Not connected")]
    NotConnected,

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Login failed: {0}")]
    LoginFailed(String),

    #[error("Unknown order: {0}")]
    UnknownOrder(String),

    #[error("Request refused: {0}")]
    Refused(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type ConnectorResult<T> = std::result::Result<T, ConnectorError>;

/// Failure reported by an event handler. Caught and logged at the
/// dispatch boundary; never propagated to other handlers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    #[error("Handler failed: {0}")]
    Failed(String),

    #[error("Unexpected event: {0}")]
    UnexpectedEvent(String),

    #[error("Publish failed: {0}")]
    Publish(#[from] PublishError),
}

/// Back-pressure from the event queue
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("Event queue full (capacity {capacity}) after {attempts} attempts")]
    QueueFull { capacity: usize, attempts: u32 },
}
