//! Engine configuration

use meridian_bus::BusConfig;
use meridian_risk_manager::RiskLimits;
use meridian_strategy::MaCrossoverParams;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Everything the engine needs to build its components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub bus: BusConfig,
    pub risk: RiskLimits,
    /// One crossover strategy per entry, registered as `MA_01`, `MA_02`, ...
    pub strategies: Vec<MaCrossoverParams>,
    /// Extra market-data symbols beyond those the strategies trade
    pub symbols: Vec<String>,
    pub user_id: String,
    pub password: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bus: BusConfig::default(),
            risk: RiskLimits::default(),
            strategies: Vec::new(),
            symbols: Vec::new(),
            user_id: "paper".to_string(),
            password: String::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn with_strategy(mut self, params: MaCrossoverParams) -> Self {
        self.strategies.push(params);
        self
    }

    pub fn with_credentials(mut self, user_id: impl Into<String>, password: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self.password = password.into();
        self
    }

    /// Strategy id for the entry at `index`
    pub fn strategy_id(index: usize) -> String {
        format!("MA_{:02}", index + 1)
    }

    /// Every symbol to subscribe: configured extras plus strategy symbols, deduplicated
    pub fn all_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self
            .symbols
            .iter()
            .chain(self.strategies.iter().map(|s| &s.symbol))
            .cloned()
            .collect();
        symbols.sort();
        symbols.dedup();
        symbols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json(
            r#"{
                "strategies": [{ "symbol": "rb2405", "short_period": 3, "long_period": 8 }],
                "symbols": ["cu2405", "rb2405"],
                "risk": { "max_position_per_symbol": 4 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.strategies.len(), 1);
        assert_eq!(config.strategies[0].short_period, 3);
        assert_eq!(config.strategies[0].volume, 1);
        assert_eq!(config.risk.max_position_per_symbol, 4);
        assert_eq!(config.risk.max_orders_per_window, 10);
        assert_eq!(config.bus, BusConfig::default());
        assert_eq!(config.all_symbols(), vec!["cu2405", "rb2405"]);
    }

    #[test]
    fn test_bad_json_is_config_error() {
        assert!(matches!(
            EngineConfig::from_json("{ strategies: "),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_strategy_ids() {
        assert_eq!(EngineConfig::strategy_id(0), "MA_01");
        assert_eq!(EngineConfig::strategy_id(11), "MA_12");
    }
}
