use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Price value - uses Decimal for precision
pub type Price = Decimal;

/// Contract count. Futures trade in whole lots.
pub type Volume = u32;

/// Timestamp in UTC
pub type Timestamp = DateTime<Utc>;

/// Symbol identifier for a tradeable contract (e.g. `rb2405`)
pub type Symbol = String;
