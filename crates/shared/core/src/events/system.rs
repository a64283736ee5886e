use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemEventType {
    Startup,
    Shutdown,
    Connect,
    Disconnect,
    Login,
    Logout,
    Error,
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemEventData {
    pub event_type: SystemEventType,
    pub message: String,
}

impl SystemEventData {
    pub fn new(event_type: SystemEventType, message: impl Into<String>) -> Self {
        Self {
            event_type,
            message: message.into(),
        }
    }
}
