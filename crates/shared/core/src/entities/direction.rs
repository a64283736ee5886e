use serde::{Deserialize, Serialize};

/// Order direction (Buy or Sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    /// Returns the opposite direction
    pub fn opposite(&self) -> Self {
        match self {
            Direction::Buy => Direction::Sell,
            Direction::Sell => Direction::Buy,
        }
    }
}

/// Open/close flag required by futures exchanges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Offset {
    Open,
    Close,
    /// Close a position opened today (SHFE distinguishes today/yesterday)
    CloseToday,
    /// Close a position carried over from a previous session
    CloseYesterday,
}

impl Offset {
    /// Returns true for any of the closing flags
    pub fn is_close(&self) -> bool {
        !matches!(self, Offset::Open)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PriceType {
    #[default]
    Limit,
    Market,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_opposite() {
        assert_eq!(Direction::Buy.opposite(), Direction::Sell);
        assert_eq!(Direction::Sell.opposite(), Direction::Buy);
    }

    #[test]
    fn test_offset_is_close() {
        assert!(!Offset::Open.is_close());
        assert!(Offset::Close.is_close());
        assert!(Offset::CloseToday.is_close());
        assert!(Offset::CloseYesterday.is_close());
    }
}
