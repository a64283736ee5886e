//! Meridian Event Bus
//!
//! Carries every event in the engine between producers (market-data and
//! broker callbacks, strategies, the risk gate) and handlers.
//!
//! ## Architecture
//!
//! ```text
//!  producer threads                         dispatch thread
//!  ────────────────                         ───────────────
//!  EventPublisher::publish ──┐
//!  EventPublisher::publish ──┼──► BoundedEventQueue ──► drain ≤ batch_size
//!  EventPublisher::publish ──┘     (MPMC ring)               │
//!          │                                                  ▼
//!          └──── notify ──► Condvar ─── wake ──►  typed handlers (kind)
//!                                                 then global handlers
//! ```
//!
//! - The queue is lock-free; publishing never blocks beyond a bounded
//!   spin/yield retry when the ring is full.
//! - One dedicated OS thread dispatches, in FIFO order, to handlers
//!   snapshotted from the registry, so handlers may publish or even
//!   (un)register from inside `handle`.
//! - A handler error or panic is logged with the handler name and the
//!   remaining handlers still run.

pub mod bus;
pub mod config;
pub mod error;
pub mod handler;
pub mod queue;
pub mod recorder;
mod registry;

// Re-export main types
pub use bus::{BusStats, EventBus, EventPublisher};
pub use config::BusConfig;
pub use error::{BusError, Result};
pub use handler::FnHandler;
pub use queue::BoundedEventQueue;
pub use recorder::EventRecorder;
