use crate::core::cache::Cache;
use crate::core::error::Result;
use crate::core::price::{Market, PriceProvider, PriceQuote};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Wraps a `PriceProvider`, keeping successful responses for a bounded
/// freshness window. Failures are never cached.
pub struct CachingPriceProvider<T: PriceProvider> {
    inner: T,
    quotes: Cache<Market, PriceQuote>,
    markets: Cache<(), Vec<Market>>,
}

impl<T: PriceProvider> CachingPriceProvider<T> {
    pub fn new(inner: T, quote_ttl: Duration, markets_ttl: Duration) -> Self {
        Self {
            inner,
            quotes: Cache::new(quote_ttl),
            markets: Cache::new(markets_ttl),
        }
    }
}

#[async_trait]
impl<T: PriceProvider> PriceProvider for CachingPriceProvider<T> {
    async fn markets(&self) -> Result<Vec<Market>> {
        if let Some(markets) = self.markets.get(&()).await {
            return Ok(markets);
        }
        let markets = self.inner.markets().await?;
        self.markets.put((), markets.clone()).await;
        Ok(markets)
    }

    async fn fetch_quote(&self, market: &Market) -> Result<PriceQuote> {
        if let Some(quote) = self.quotes.get(market).await {
            debug!("Serving cached quote for {}", market);
            return Ok(quote);
        }
        let quote = self.inner.fetch_quote(market).await?;
        self.quotes.put(market.clone(), quote.clone()).await;
        Ok(quote)
    }
}
