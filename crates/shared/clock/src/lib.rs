//! Meridian Clock Infrastructure
//!
//! Two time sources behind the [`Clock`] port:
//!
//! - [`SystemClock`]: wall-clock UTC, used by the running engine
//! - [`ManualClock`]: frozen time that only moves when told to, used to
//!   drive sliding-window risk rules and strategy timestamps in tests
//!
//! ```ignore
//! use meridian_clock::ManualClock;
//! use chrono::Duration;
//!
//! let clock = ManualClock::starting_now();
//! let t0 = clock.now();
//! clock.advance(Duration::seconds(6));
//! assert_eq!(clock.now() - t0, Duration::seconds(6));
//! ```

mod manual;
mod system;

pub use manual::ManualClock;
pub use system::SystemClock;

// Re-export the Clock trait for convenience
pub use meridian_ports::Clock;
