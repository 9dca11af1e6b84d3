//! Conversion routing between currencies over the exchange's market list.
//!
//! Policy, tried in order:
//! 1. same currency, no market needed;
//! 2. direct market `FROM-TO`;
//! 3. inverse market `TO-FROM`, priced as `1 / price`;
//! 4. two hops through each bridge currency in configured order, each leg
//!    direct or inverse.

use crate::core::error::{Error, Result};
use crate::core::price::{Market, PriceQuote};
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Leg {
    Direct(Market),
    Inverse(Market),
}

impl Leg {
    pub fn market(&self) -> &Market {
        match self {
            Leg::Direct(market) | Leg::Inverse(market) => market,
        }
    }

    fn apply(&self, price: Decimal) -> Result<Decimal> {
        match self {
            Leg::Direct(_) => Ok(price),
            Leg::Inverse(market) => Decimal::ONE.checked_div(price).ok_or_else(|| {
                Error::UpstreamDataError(format!("Cannot invert price {price} of {market}"))
            }),
        }
    }
}

/// How to price one unit of a currency in another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub from: String,
    pub to: String,
    pub legs: Vec<Leg>,
}

impl Route {
    pub fn markets(&self) -> impl Iterator<Item = &Market> {
        self.legs.iter().map(Leg::market)
    }

    /// Price of one unit of `from` in `to`, from already fetched quotes.
    pub fn price(&self, quotes: &HashMap<Market, PriceQuote>) -> Result<Decimal> {
        self.legs.iter().try_fold(Decimal::ONE, |acc, leg| {
            let quote = quotes.get(leg.market()).ok_or_else(|| Error::PriceNotFound {
                base: leg.market().base.clone(),
                quote: leg.market().quote.clone(),
            })?;
            let leg_price = leg.apply(quote.price)?;
            acc.checked_mul(leg_price).ok_or_else(|| {
                Error::UpstreamDataError(format!(
                    "Price overflow converting {} to {}",
                    self.from, self.to
                ))
            })
        })
    }
}

/// Lookup structure over the markets traded on the price source.
#[derive(Debug, Clone, Default)]
pub struct MarketIndex {
    markets: HashSet<Market>,
    currencies: BTreeSet<String>,
}

impl MarketIndex {
    pub fn new(markets: impl IntoIterator<Item = Market>) -> Self {
        let mut index = MarketIndex::default();
        for market in markets {
            index.currencies.insert(market.base.clone());
            index.currencies.insert(market.quote.clone());
            index.markets.insert(market);
        }
        index
    }

    /// Whether the currency is traded on at least one market.
    pub fn knows(&self, currency: &str) -> bool {
        self.currencies.contains(currency)
    }

    fn leg(&self, from: &str, to: &str) -> Option<Leg> {
        let direct = Market::new(from, to);
        if self.markets.contains(&direct) {
            return Some(Leg::Direct(direct));
        }
        let inverse = Market::new(to, from);
        if self.markets.contains(&inverse) {
            return Some(Leg::Inverse(inverse));
        }
        None
    }

    pub fn route(&self, from: &str, to: &str, bridges: &[String]) -> Result<Route> {
        let route = |legs: Vec<Leg>| Route {
            from: from.to_string(),
            to: to.to_string(),
            legs,
        };

        if from == to {
            return Ok(route(vec![]));
        }
        if let Some(leg) = self.leg(from, to) {
            return Ok(route(vec![leg]));
        }
        for bridge in bridges {
            let bridge = bridge.to_uppercase();
            if bridge == from || bridge == to {
                continue;
            }
            if let (Some(first), Some(second)) = (self.leg(from, &bridge), self.leg(&bridge, to)) {
                return Ok(route(vec![first, second]));
            }
        }
        Err(Error::PriceNotFound {
            base: from.to_string(),
            quote: to.to_string(),
        })
    }
}
