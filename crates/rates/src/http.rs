//! HTTP-backed rate source.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::ticker::{extract_rate, TickerResponse};
use crate::{CurrencyPair, RateError, RateSource};

/// Tuning knobs for [`HttpRateSource`]
#[derive(Debug, Clone)]
pub struct RateClientConfig {
    /// Ticker endpoint URL
    pub endpoint: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// How long a fetched rate stays fresh
    pub cache_ttl: Duration,
    /// Extra attempts after a transient failure
    pub retry_attempts: u32,
    /// Pause between attempts
    pub retry_backoff: Duration,
}

impl Default for RateClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://api-cryptopia.adca.sh/v1/prices/ticker".to_string(),
            timeout: Duration::from_secs(10),
            cache_ttl: Duration::from_secs(30),
            retry_attempts: 2,
            retry_backoff: Duration::from_millis(250),
        }
    }
}

struct CachedRate {
    rate: Decimal,
    fetched_at: Instant,
}

/// Rate source that polls a ticker endpoint over HTTP.
///
/// Fetched rates are cached per pair for a configurable time so that a
/// burst of balance requests does not hammer the venue. Only transient
/// failures (timeouts, connection errors, 5xx answers) are retried;
/// malformed responses fail immediately.
pub struct HttpRateSource {
    client: Client,
    config: RateClientConfig,
    cache: RwLock<HashMap<String, CachedRate>>,
}

impl HttpRateSource {
    /// Build a source from the given configuration
    pub fn new(config: RateClientConfig) -> Result<Self, RateError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config,
            cache: RwLock::new(HashMap::new()),
        })
    }

    async fn cached(&self, symbol: &str) -> Option<Decimal> {
        let cache = self.cache.read().await;
        cache
            .get(symbol)
            .filter(|entry| entry.fetched_at.elapsed() < self.config.cache_ttl)
            .map(|entry| entry.rate)
    }

    async fn remember(&self, symbol: String, rate: Decimal) {
        let mut cache = self.cache.write().await;
        cache.insert(
            symbol,
            CachedRate {
                rate,
                fetched_at: Instant::now(),
            },
        );
    }

    async fn fetch(&self, pair: &CurrencyPair) -> Result<Decimal, RateError> {
        let response = self.client.get(&self.config.endpoint).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RateError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let ticker: TickerResponse = serde_json::from_str(&body)?;
        extract_rate(&ticker, pair)
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    async fn current_rate(&self, pair: &CurrencyPair) -> Result<Decimal, RateError> {
        let symbol = pair.symbol();
        if let Some(rate) = self.cached(&symbol).await {
            debug!("serving cached rate for {}", symbol);
            return Ok(rate);
        }

        let mut attempt = 0;
        loop {
            match self.fetch(pair).await {
                Ok(rate) => {
                    debug!("fetched rate for {}: {}", symbol, rate);
                    self.remember(symbol, rate).await;
                    return Ok(rate);
                }
                Err(err) if err.is_transient() && attempt < self.config.retry_attempts => {
                    attempt += 1;
                    warn!(
                        "transient quote failure for {} (attempt {}): {}",
                        symbol, attempt, err
                    );
                    tokio::time::sleep(self.config.retry_backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
