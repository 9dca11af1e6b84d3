//! Portfolio and valuation types
use crate::core::error::{Error, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Holding {
    pub asset: String,
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Portfolio {
    #[serde(default)]
    pub holdings: Vec<Holding>,
    pub currency: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ValuationResult {
    pub total_value: Decimal,
    pub currency: String,
    pub breakdown: BTreeMap<String, Decimal>,
}

impl Portfolio {
    /// Checks the portfolio shape and returns holdings keyed by upper-case
    /// asset symbol, with duplicate assets merged.
    ///
    /// Whether assets are actually traded is checked later against the
    /// market list.
    pub fn normalized_holdings(&self) -> Result<BTreeMap<String, Decimal>> {
        if self.currency.trim().is_empty() {
            return Err(Error::InvalidInput("currency must not be empty".to_string()));
        }

        let mut merged = BTreeMap::new();
        for holding in &self.holdings {
            let asset = holding.asset.trim().to_uppercase();
            if asset.is_empty() {
                return Err(Error::InvalidInput(
                    "asset symbol must not be empty".to_string(),
                ));
            }
            if holding.quantity < Decimal::ZERO {
                return Err(Error::InvalidInput(format!(
                    "quantity for {} must not be negative, got {}",
                    asset, holding.quantity
                )));
            }
            let total = merged.entry(asset.clone()).or_insert(Decimal::ZERO);
            *total = total.checked_add(holding.quantity).ok_or_else(|| {
                Error::InvalidInput(format!("quantity for {asset} is out of range"))
            })?;
        }
        Ok(merged)
    }

    pub fn target_currency(&self) -> String {
        self.currency.trim().to_uppercase()
    }
}

/// Number of decimal places a currency is quoted with.
pub fn currency_precision(currency: &str) -> u32 {
    match currency.to_uppercase().as_str() {
        "CLP" | "COP" => 0,
        "PEN" | "ARS" | "USD" | "USDC" | "USDT" | "EUR" => 2,
        "BTC" | "ETH" | "LTC" | "BCH" => 8,
        _ => 2,
    }
}

/// Rounds half-even to the currency precision, padding the scale so that
/// e.g. `30000` renders as `30000.00` for USD.
pub fn round_to_currency(value: Decimal, currency: &str) -> Decimal {
    let dp = currency_precision(currency);
    let mut rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(dp);
    rounded
}
