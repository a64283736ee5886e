//! Event bus errors

use meridian_ports::PublishError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("Event bus already running")]
    AlreadyRunning,

    #[error("Failed to spawn dispatch thread: {0}")]
    Spawn(String),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

pub type Result<T> = std::result::Result<T, BusError>;
