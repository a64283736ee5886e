use std::collections::HashMap;

use log::debug;
use meridian_core::{Event, Offset, PositionDirection, RiskType, Volume};
use parking_lot::Mutex;

use super::{RiskDecision, RiskRule, order_intent};

/// Caps open volume per symbol and across all symbols.
///
/// Exposure is learned from Position events (or pushed by hand with
/// `update_position`); long and short volume both count toward a symbol's
/// aggregate. Only opening intents are checked, a close never adds exposure.
/// Reaching a limit exactly is allowed; exceeding it is not.
pub struct PositionLimitRule {
    name: String,
    max_per_symbol: u64,
    max_total: u64,
    positions: Mutex<HashMap<(String, PositionDirection), u64>>,
}

impl PositionLimitRule {
    pub fn new(max_per_symbol: u64, max_total: u64) -> Self {
        Self {
            name: "PositionLimitRule".to_string(),
            max_per_symbol,
            max_total,
            positions: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Overwrite the open volume held for one symbol and side
    pub fn update_position(&self, symbol: &str, direction: PositionDirection, volume: Volume) {
        let mut positions = self.positions.lock();
        if volume == 0 {
            positions.remove(&(symbol.to_string(), direction));
        } else {
            positions.insert((symbol.to_string(), direction), u64::from(volume));
        }
    }

    /// Long plus short volume held in `symbol`
    pub fn symbol_position(&self, symbol: &str) -> u64 {
        self.positions
            .lock()
            .iter()
            .filter(|((s, _), _)| s == symbol)
            .map(|(_, v)| *v)
            .sum()
    }

    pub fn total_position(&self) -> u64 {
        self.positions.lock().values().sum()
    }
}

impl RiskRule for PositionLimitRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn risk_type(&self) -> RiskType {
        RiskType::PositionLimit
    }

    fn check(&self, event: &Event) -> RiskDecision {
        if let Some(position) = event.as_position() {
            self.update_position(&position.symbol, position.direction, position.total_position);
            return RiskDecision::Approved;
        }

        let Some(order) = order_intent(event) else {
            return RiskDecision::Approved;
        };
        if order.offset != Offset::Open {
            return RiskDecision::Approved;
        }

        let requested = u64::from(order.volume);
        let positions = self.positions.lock();
        let symbol_total: u64 = positions
            .iter()
            .filter(|((s, _), _)| *s == order.symbol)
            .map(|(_, v)| *v)
            .sum();
        let total: u64 = positions.values().sum();
        drop(positions);

        debug!(
            "[RISK] {}: {} holds {} (+{}), book holds {}",
            self.name, order.symbol, symbol_total, requested, total
        );

        if symbol_total + requested > self.max_per_symbol {
            return RiskDecision::Rejected(format!(
                "{} position {} + {} exceeds per-symbol limit {}",
                order.symbol, symbol_total, requested, self.max_per_symbol
            ));
        }
        if total + requested > self.max_total {
            return RiskDecision::Rejected(format!(
                "total position {} + {} exceeds limit {}",
                total, requested, self.max_total
            ));
        }
        RiskDecision::Approved
    }
}
