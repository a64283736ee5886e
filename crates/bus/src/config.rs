//! Event bus configuration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Ring capacity; rounded up to a power of two
    pub queue_capacity: usize,
    /// Maximum events drained per dispatch pass
    pub batch_size: usize,
    /// Push attempts before `publish` gives up on a full queue
    pub publish_retries: u32,
    /// Attempts that spin before switching to `yield_now`
    pub spin_before_yield: u32,
    /// Name of the dispatch thread
    pub thread_name: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            batch_size: 1000,
            publish_retries: 64,
            spin_before_yield: 16,
            thread_name: "event-dispatch".to_string(),
        }
    }
}

impl BusConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_publish_retries(mut self, retries: u32) -> Self {
        self.publish_retries = retries.max(1);
        self
    }
}
