use crate::core::config::BudaProviderConfig;
use crate::core::error::{Error, Result};
use crate::core::price::{Market, PriceProvider, PriceQuote};
use crate::providers::util::{status_error, with_retry};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, instrument};

/// Price provider backed by the Buda exchange public API.
pub struct BudaProvider {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
    retries: usize,
    retry_delay_ms: u64,
}

impl BudaProvider {
    pub fn new(config: &BudaProviderConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("folioval/0.1")
            .timeout(config.timeout())
            .build()?;
        Ok(BudaProvider {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            timeout: config.timeout(),
            retries: config.retries,
            retry_delay_ms: config.retry_delay_ms,
        })
    }

    /// GETs `endpoint` and parses the JSON body. A 404 yields `Ok(None)`.
    ///
    /// The timeout bounds the whole fetch, retries included.
    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str, what: &str) -> Result<Option<T>> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("Requesting {} from {}", what, url);

        let fetch = with_retry(
            || async {
                let response = self.client.get(&url).send().await?;
                let status = response.status();
                if status == reqwest::StatusCode::NOT_FOUND {
                    return Ok(None);
                }
                if !status.is_success() {
                    return Err(status_error(status, what));
                }
                Ok::<_, Error>(Some(response.text().await?))
            },
            self.retries,
            self.retry_delay_ms,
        );
        let text = tokio::time::timeout(self.timeout, fetch)
            .await
            .map_err(|_| {
                Error::UpstreamUnavailable(format!(
                    "Timed out after {:?} fetching {what}",
                    self.timeout
                ))
            })??;

        text.map(|text| {
            serde_json::from_str(&text).map_err(|e| {
                Error::UpstreamDataError(format!("Failed to parse JSON response for {what}: {e}"))
            })
        })
        .transpose()
    }
}

#[derive(Debug, Deserialize)]
struct MarketsResponse {
    markets: Vec<MarketItem>,
}

#[derive(Debug, Deserialize)]
struct MarketItem {
    base_currency: String,
    quote_currency: String,
    #[serde(default)]
    disabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct TickerResponse {
    ticker: Ticker,
}

#[derive(Debug, Deserialize)]
struct Ticker {
    /// `[amount, currency]`, amount as a decimal string.
    last_price: (String, String),
}

#[async_trait]
impl PriceProvider for BudaProvider {
    #[instrument(name = "BudaMarkets", skip(self))]
    async fn markets(&self) -> Result<Vec<Market>> {
        let data: MarketsResponse = self
            .get_json("/markets", "markets")
            .await?
            .ok_or_else(|| Error::UpstreamDataError("Markets endpoint not found".to_string()))?;
        let markets: Vec<Market> = data
            .markets
            .into_iter()
            .filter(|m| !m.disabled.unwrap_or(false))
            .map(|m| Market::new(&m.base_currency, &m.quote_currency))
            .collect();
        debug!("Fetched {} markets", markets.len());
        Ok(markets)
    }

    #[instrument(name = "BudaQuoteFetch", skip(self), fields(market = %market))]
    async fn fetch_quote(&self, market: &Market) -> Result<PriceQuote> {
        let endpoint = format!("/markets/{}/ticker", market.id().to_lowercase());
        let data: TickerResponse = self
            .get_json(&endpoint, &market.id())
            .await?
            .ok_or_else(|| Error::PriceNotFound {
                base: market.base.clone(),
                quote: market.quote.clone(),
            })?;

        let (amount, currency) = data.ticker.last_price;
        if !currency.eq_ignore_ascii_case(&market.quote) {
            return Err(Error::UpstreamDataError(format!(
                "Ticker for {} quoted in {}",
                market, currency
            )));
        }
        let price = Decimal::from_str(amount.trim()).map_err(|e| {
            Error::UpstreamDataError(format!("Invalid price '{amount}' for {market}: {e}"))
        })?;
        if price <= Decimal::ZERO {
            return Err(Error::UpstreamDataError(format!(
                "Non-positive price {price} for {market}"
            )));
        }

        debug!("Fetched price for {}: {}", market, price);
        Ok(PriceQuote {
            base: market.base.clone(),
            quote: market.quote.clone(),
            price,
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> BudaProvider {
        let config = BudaProviderConfig {
            base_url: server.uri(),
            timeout_secs: 2,
            retries: 1,
            retry_delay_ms: 1,
        };
        BudaProvider::new(&config).unwrap()
    }

    async fn mount(server: &MockServer, url_path: &str, template: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(url_path))
            .respond_with(template)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_successful_markets_fetch() {
        let mock_server = MockServer::start().await;
        let body = r#"{
            "markets": [
                {"id": "BTC-CLP", "name": "btc-clp", "base_currency": "BTC", "quote_currency": "CLP"},
                {"id": "ETH-BTC", "name": "eth-btc", "base_currency": "ETH", "quote_currency": "BTC", "disabled": false},
                {"id": "LTC-CLP", "name": "ltc-clp", "base_currency": "LTC", "quote_currency": "CLP", "disabled": true}
            ]
        }"#;
        mount(&mock_server, "/markets", ResponseTemplate::new(200).set_body_string(body)).await;

        let markets = provider(&mock_server).markets().await.unwrap();
        assert_eq!(
            markets,
            vec![Market::new("BTC", "CLP"), Market::new("ETH", "BTC")]
        );
    }

    #[tokio::test]
    async fn test_successful_quote_fetch() {
        let mock_server = MockServer::start().await;
        let body = r#"{
            "ticker": {
                "market_id": "BTC-CLP",
                "last_price": ["60000000.0", "CLP"],
                "min_ask": ["60100000.0", "CLP"],
                "max_bid": ["59900000.0", "CLP"],
                "volume": ["12.5", "BTC"],
                "price_variation_24h": "0.01",
                "price_variation_7d": "-0.02"
            }
        }"#;
        mount(
            &mock_server,
            "/markets/btc-clp/ticker",
            ResponseTemplate::new(200).set_body_string(body),
        )
        .await;

        let quote = provider(&mock_server)
            .fetch_quote(&Market::new("BTC", "CLP"))
            .await
            .unwrap();
        assert_eq!(quote.price, dec!(60000000.0));
        assert_eq!(quote.base, "BTC");
        assert_eq!(quote.quote, "CLP");
    }

    #[tokio::test]
    async fn test_unknown_market_is_price_not_found() {
        let mock_server = MockServer::start().await;
        mount(
            &mock_server,
            "/markets/doge-clp/ticker",
            ResponseTemplate::new(404)
                .set_body_string(r#"{"message":"Not found","code":"not_found"}"#),
        )
        .await;

        let err = provider(&mock_server)
            .fetch_quote(&Market::new("DOGE", "CLP"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            Error::PriceNotFound {
                base: "DOGE".into(),
                quote: "CLP".into()
            }
        );
    }

    #[tokio::test]
    async fn test_malformed_ticker_is_data_error() {
        let mock_server = MockServer::start().await;
        mount(
            &mock_server,
            "/markets/btc-clp/ticker",
            ResponseTemplate::new(200).set_body_string(r#"{"ticker": {"last": 1}}"#),
        )
        .await;

        let err = provider(&mock_server)
            .fetch_quote(&Market::new("BTC", "CLP"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UpstreamDataError(_)));
        assert!(err.to_string().contains("Failed to parse JSON response for BTC-CLP"));
    }

    #[tokio::test]
    async fn test_non_positive_price_is_data_error() {
        let mock_server = MockServer::start().await;
        mount(
            &mock_server,
            "/markets/btc-clp/ticker",
            ResponseTemplate::new(200)
                .set_body_string(r#"{"ticker": {"last_price": ["0.0", "CLP"]}}"#),
        )
        .await;

        let err = provider(&mock_server)
            .fetch_quote(&Market::new("BTC", "CLP"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UpstreamDataError(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_retried_then_unavailable() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/markets"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&mock_server)
            .await;

        let err = provider(&mock_server).markets().await.unwrap_err();
        assert_eq!(
            err,
            Error::UpstreamUnavailable("HTTP error: 500 Internal Server Error for markets".into())
        );
    }

    #[tokio::test]
    async fn test_timeout_is_unavailable() {
        let mock_server = MockServer::start().await;
        mount(
            &mock_server,
            "/markets",
            ResponseTemplate::new(200)
                .set_body_string(r#"{"markets": []}"#)
                .set_delay(std::time::Duration::from_secs(5)),
        )
        .await;

        let config = BudaProviderConfig {
            base_url: mock_server.uri(),
            timeout_secs: 1,
            retries: 0,
            retry_delay_ms: 1,
        };
        let err = BudaProvider::new(&config).unwrap().markets().await.unwrap_err();
        assert!(matches!(err, Error::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn test_timeout_bounds_retries() {
        let mock_server = MockServer::start().await;
        mount(&mock_server, "/markets", ResponseTemplate::new(503)).await;

        let config = BudaProviderConfig {
            base_url: mock_server.uri(),
            timeout_secs: 1,
            retries: 5,
            retry_delay_ms: 400,
        };
        let started = std::time::Instant::now();
        let err = BudaProvider::new(&config).unwrap().markets().await.unwrap_err();

        assert!(started.elapsed() < std::time::Duration::from_millis(1900));
        assert_eq!(
            err,
            Error::UpstreamUnavailable("Timed out after 1s fetching markets".into())
        );
    }
}
