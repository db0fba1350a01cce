//! Exchange rate lookup.
//!
//! The [`RateSource`] trait abstracts where quotes come from so that
//! balance reporting can be exercised without a network. The shipped
//! implementation, [`HttpRateSource`], polls a ticker endpoint and keeps
//! a short-lived cache of the rates it has seen.

pub mod http;
pub mod ticker;

pub use http::{HttpRateSource, RateClientConfig};
pub use ticker::{TickerEntry, TickerResponse};

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

/// A base/quote currency pair such as BTC/EUR
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CurrencyPair {
    base: String,
    quote: String,
}

impl CurrencyPair {
    /// Build a pair, normalizing both currencies to upper case
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into().to_uppercase(),
            quote: quote.into().to_uppercase(),
        }
    }

    /// The currency being priced
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The currency the price is expressed in
    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// Ticker symbol for the pair, e.g. "BTC/EUR"
    pub fn symbol(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// A pair string did not have the form BASE/QUOTE
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("currency pair must have the form BASE/QUOTE, got {0:?}")]
pub struct ParsePairError(pub String);

impl FromStr for CurrencyPair {
    type Err = ParsePairError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((base, quote)) if !base.trim().is_empty() && !quote.trim().is_empty() => {
                Ok(CurrencyPair::new(base.trim(), quote.trim()))
            }
            _ => Err(ParsePairError(s.to_string())),
        }
    }
}

/// Errors surfaced when looking up an exchange rate
#[derive(Debug, Error)]
pub enum RateError {
    /// The request never produced a usable response
    #[error("quote request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status
    #[error("quote endpoint returned HTTP status {0}")]
    Status(u16),

    /// The response body was not the expected ticker document
    #[error("quote response could not be decoded: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The ticker document carries no price data at all
    #[error("quote response carries no price data")]
    MissingData,

    /// The requested pair is not quoted in the response
    #[error("no quote for {pair} in the response")]
    SymbolNotFound { pair: String },

    /// The pair is quoted but its value is not numeric
    #[error("quote for {pair} is not a numeric value")]
    NonNumericRate { pair: String },
}

impl RateError {
    /// Whether retrying the lookup could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            RateError::Http(err) => err.is_timeout() || err.is_connect(),
            RateError::Status(code) => *code >= 500,
            _ => false,
        }
    }
}

/// Source of current exchange rates
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Current rate for `pair`, in quote units per base unit
    async fn current_rate(&self, pair: &CurrencyPair) -> Result<Decimal, RateError>;
}
