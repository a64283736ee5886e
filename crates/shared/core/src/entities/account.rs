use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Futures account snapshot as reported by the broker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountData {
    pub account_id: String,
    pub balance: Decimal,
    pub available: Decimal,
    pub frozen_margin: Decimal,
    pub frozen_commission: Decimal,
    pub commission: Decimal,
    pub margin: Decimal,
    pub close_profit: Decimal,
    pub position_profit: Decimal,
    pub pre_balance: Decimal,
    pub deposit: Decimal,
    pub withdraw: Decimal,
}

impl AccountData {
    pub fn new(account_id: impl Into<String>, balance: Decimal) -> Self {
        Self {
            account_id: account_id.into(),
            balance,
            available: balance,
            pre_balance: balance,
            ..Default::default()
        }
    }
}
