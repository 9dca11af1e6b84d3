//! Pricing abstractions and core types

use crate::core::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// A tradable pair on the exchange, e.g. `BTC-CLP`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Market {
    pub base: String,
    pub quote: String,
}

impl Market {
    pub fn new(base: &str, quote: &str) -> Self {
        Market {
            base: base.to_uppercase(),
            quote: quote.to_uppercase(),
        }
    }

    pub fn id(&self) -> String {
        format!("{}-{}", self.base, self.quote)
    }
}

impl Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.base, self.quote)
    }
}

impl FromStr for Market {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('-') {
            Some((base, quote)) if !base.is_empty() && !quote.is_empty() => {
                Ok(Market::new(base, quote))
            }
            _ => Err(anyhow::anyhow!("Invalid market id: {}", s)),
        }
    }
}

/// A single price observation for a market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub base: String,
    pub quote: String,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl PriceQuote {
    pub fn market(&self) -> Market {
        Market::new(&self.base, &self.quote)
    }
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Lists the markets currently traded on the price source.
    async fn markets(&self) -> Result<Vec<Market>>;

    /// Fetches the latest price for one market.
    async fn fetch_quote(&self, market: &Market) -> Result<PriceQuote>;
}
