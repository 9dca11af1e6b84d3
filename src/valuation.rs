//! Values a portfolio in a target currency using exchange prices.
use crate::core::error::{Error, Result};
use crate::core::portfolio::{Portfolio, ValuationResult, round_to_currency};
use crate::core::price::{Market, PriceProvider, PriceQuote};
use crate::route::{MarketIndex, Route};
use futures::future::try_join_all;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct Valuator {
    provider: Arc<dyn PriceProvider>,
    bridges: Vec<String>,
}

impl Valuator {
    pub fn new(provider: Arc<dyn PriceProvider>, bridges: Vec<String>) -> Self {
        Self { provider, bridges }
    }

    pub fn provider(&self) -> &Arc<dyn PriceProvider> {
        &self.provider
    }

    /// Computes the total value of `portfolio`.
    ///
    /// Either every holding is priced or the whole valuation fails; partial
    /// totals are never returned. Quotes for distinct markets are fetched
    /// concurrently and each market is fetched at most once.
    #[instrument(
        name = "Valuation",
        skip(self, portfolio),
        fields(currency = %portfolio.currency, holdings = portfolio.holdings.len())
    )]
    pub async fn value(&self, portfolio: &Portfolio) -> Result<ValuationResult> {
        let holdings = portfolio.normalized_holdings()?;
        let target = portfolio.target_currency();

        if holdings.is_empty() {
            debug!("Empty portfolio, skipping price lookup");
            return Ok(ValuationResult {
                total_value: round_to_currency(Decimal::ZERO, &target),
                currency: target,
                breakdown: BTreeMap::new(),
            });
        }

        let index = MarketIndex::new(self.provider.markets().await?);
        if !index.knows(&target) {
            return Err(Error::InvalidInput(format!("Invalid currency: {target}")));
        }
        if let Some(asset) = holdings.keys().find(|asset| !index.knows(asset)) {
            return Err(Error::InvalidInput(format!("Invalid asset: {asset}")));
        }

        let routes = holdings
            .keys()
            .map(|asset| {
                index
                    .route(asset, &target, &self.bridges)
                    .map(|route| (asset.clone(), route))
            })
            .collect::<Result<BTreeMap<String, Route>>>()?;

        let quotes = self.fetch_quotes(routes.values()).await?;

        let mut total = Decimal::ZERO;
        let mut breakdown = BTreeMap::new();
        for (asset, quantity) in &holdings {
            let price = routes[asset].price(&quotes)?;
            let value = quantity.checked_mul(price).ok_or_else(|| {
                Error::InvalidInput(format!("Value of {asset} holding is out of range"))
            })?;
            debug!("{} {} x {} = {} {}", quantity, asset, price, value, target);

            total = total
                .checked_add(value)
                .ok_or_else(|| Error::InvalidInput("Portfolio value is out of range".to_string()))?;
            breakdown.insert(asset.clone(), round_to_currency(value, &target));
        }

        Ok(ValuationResult {
            total_value: round_to_currency(total, &target),
            currency: target,
            breakdown,
        })
    }

    async fn fetch_quotes<'a>(
        &self,
        routes: impl Iterator<Item = &'a Route>,
    ) -> Result<HashMap<Market, PriceQuote>> {
        let markets: BTreeSet<&Market> = routes.flat_map(|route| route.markets()).collect();
        debug!("Fetching {} quotes", markets.len());

        let quotes = try_join_all(
            markets
                .into_iter()
                .map(|market| self.provider.fetch_quote(market)),
        )
        .await?;

        Ok(quotes.into_iter().map(|q| (q.market(), q)).collect())
    }
}
