//! Live share prices for holdings entry.
//!
//! Prices come from a chain of [`PriceSource`]s tried in order. Callers are
//! throttled per client by a fixed-window [`RateLimiter`].

pub mod limiter;
pub mod sources;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::core::Holding;

pub use limiter::{RateLimiter, RateLimiterConfig};
pub use sources::{FinnhubSource, YahooSource};

#[derive(Error, Debug)]
pub enum QuoteError {
    #[error("Too many requests. Try again in a minute.")]
    RateLimited,
    #[error("Invalid ticker symbol")]
    InvalidTicker,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{source_name} returned HTTP {status}")]
    Status { source_name: &'static str, status: u16 },
    #[error("{source_name} returned no usable price for {ticker}")]
    NoPrice {
        source_name: &'static str,
        ticker: String,
    },
    #[error("Could not fetch price from any source")]
    Unavailable,
}

/// A price as reported by one source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub price: f64,
    pub source: &'static str,
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn latest_price(&self, ticker: &str) -> Result<f64, QuoteError>;
}

/// Wire shape of a lookup, success or failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PriceResult {
    pub fn found(quote: Quote) -> Self {
        Self {
            success: true,
            price: Some(round_price(quote.price)),
            source: Some(quote.source.to_string()),
            error: None,
        }
    }

    pub fn failed(err: &QuoteError) -> Self {
        Self {
            success: false,
            price: None,
            source: None,
            error: Some(err.to_string()),
        }
    }
}

/// One to five uppercase ASCII letters.
pub fn is_valid_ticker(ticker: &str) -> bool {
    (1..=5).contains(&ticker.len()) && ticker.bytes().all(|b| b.is_ascii_uppercase())
}

pub fn round_price(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

/// Tries each source in order and returns the first usable price.
pub struct FallbackPriceLookup {
    sources: Vec<Box<dyn PriceSource>>,
}

impl FallbackPriceLookup {
    pub fn new(sources: Vec<Box<dyn PriceSource>>) -> Self {
        Self { sources }
    }

    /// Finnhub first when a key is configured, then Yahoo.
    pub fn from_settings(settings: &QuoteSettings) -> Result<Self, QuoteError> {
        let mut sources: Vec<Box<dyn PriceSource>> = Vec::new();
        if let Some(key) = settings.finnhub_api_key.as_deref().filter(|k| !k.is_empty()) {
            sources.push(Box::new(FinnhubSource::new(key, settings.timeout)?));
        }
        sources.push(Box::new(YahooSource::new(settings.timeout)?));
        Ok(Self::new(sources))
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub async fn lookup(&self, ticker: &str) -> Result<Quote, QuoteError> {
        if !is_valid_ticker(ticker) {
            return Err(QuoteError::InvalidTicker);
        }
        for source in &self.sources {
            match source.latest_price(ticker).await {
                Ok(price) => {
                    return Ok(Quote {
                        price,
                        source: source.name(),
                    });
                }
                Err(err) => {
                    tracing::debug!(
                        source = source.name(),
                        %ticker,
                        error = %err,
                        "price source failed"
                    );
                }
            }
        }
        tracing::warn!(%ticker, "no price source answered");
        Err(QuoteError::Unavailable)
    }

    /// Re-prices each holding in place, keeping the old price when no source
    /// answers. Returns how many holdings were updated.
    pub async fn refresh_holdings(&self, holdings: &mut [Holding]) -> usize {
        let mut updated = 0;
        for holding in holdings.iter_mut() {
            match self.lookup(&holding.ticker).await {
                Ok(quote) => {
                    holding.price = round_price(quote.price);
                    updated += 1;
                }
                Err(err) => {
                    tracing::warn!(
                        ticker = %holding.ticker,
                        error = %err,
                        "keeping imported price"
                    );
                }
            }
        }
        updated
    }
}

#[derive(Debug, Clone)]
pub struct QuoteSettings {
    pub finnhub_api_key: Option<String>,
    pub timeout: std::time::Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::HoldingType;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSource {
        name: &'static str,
        price: Option<f64>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeSource {
        fn boxed(
            name: &'static str,
            price: Option<f64>,
            calls: &Arc<AtomicUsize>,
        ) -> Box<dyn PriceSource> {
            Box::new(Self {
                name,
                price,
                calls: Arc::clone(calls),
            })
        }
    }

    #[async_trait]
    impl PriceSource for FakeSource {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn latest_price(&self, ticker: &str) -> Result<f64, QuoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.price.ok_or_else(|| QuoteError::NoPrice {
                source_name: self.name,
                ticker: ticker.to_string(),
            })
        }
    }

    #[test]
    fn ticker_validation_accepts_only_short_uppercase_symbols() {
        assert!(is_valid_ticker("A"));
        assert!(is_valid_ticker("GOOGL"));
        assert!(!is_valid_ticker(""));
        assert!(!is_valid_ticker("GOOGLE"));
        assert!(!is_valid_ticker("voo"));
        assert!(!is_valid_ticker("BRK.B"));
        assert!(!is_valid_ticker("ÄBC"));
    }

    #[test]
    fn price_result_rounds_to_cents_and_skips_empty_fields() {
        let found = PriceResult::found(Quote {
            price: 412.3456,
            source: "Yahoo",
        });
        assert_eq!(found.price, Some(412.35));
        let json = serde_json::to_value(&found).expect("serializes");
        assert_eq!(json["success"], true);
        assert_eq!(json["source"], "Yahoo");
        assert!(json.get("error").is_none());

        let failed = PriceResult::failed(&QuoteError::Unavailable);
        let json = serde_json::to_value(&failed).expect("serializes");
        assert_eq!(json["error"], "Could not fetch price from any source");
        assert!(json.get("price").is_none());
    }

    #[tokio::test]
    async fn lookup_falls_back_to_next_source() {
        let calls = Arc::new(AtomicUsize::new(0));
        let lookup = FallbackPriceLookup::new(vec![
            FakeSource::boxed("Finnhub", None, &calls),
            FakeSource::boxed("Yahoo", Some(101.5), &calls),
        ]);

        let quote = lookup.lookup("VOO").await.expect("second source answers");
        assert_eq!(quote.source, "Yahoo");
        assert_eq!(quote.price, 101.5);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn lookup_stops_at_first_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let lookup = FallbackPriceLookup::new(vec![
            FakeSource::boxed("Finnhub", Some(20.0), &calls),
            FakeSource::boxed("Yahoo", Some(21.0), &calls),
        ]);

        let quote = lookup.lookup("VTI").await.expect("first source answers");
        assert_eq!(quote.source, "Finnhub");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn lookup_reports_unavailable_when_every_source_fails() {
        let calls = Arc::new(AtomicUsize::new(0));
        let lookup = FallbackPriceLookup::new(vec![FakeSource::boxed("Yahoo", None, &calls)]);
        let err = lookup.lookup("VTI").await.expect_err("nothing answers");
        assert!(matches!(err, QuoteError::Unavailable));
    }

    #[tokio::test]
    async fn lookup_rejects_bad_tickers_before_any_source() {
        let calls = Arc::new(AtomicUsize::new(0));
        let lookup = FallbackPriceLookup::new(vec![FakeSource::boxed("Yahoo", Some(1.0), &calls)]);
        let err = lookup.lookup("vti").await.expect_err("lowercase rejected");
        assert!(matches!(err, QuoteError::InvalidTicker));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    /// Answers only for the tickers it was given.
    struct TableSource(Vec<(&'static str, f64)>);

    #[async_trait]
    impl PriceSource for TableSource {
        fn name(&self) -> &'static str {
            "Table"
        }

        async fn latest_price(&self, ticker: &str) -> Result<f64, QuoteError> {
            self.0
                .iter()
                .find(|(known, _)| *known == ticker)
                .map(|&(_, price)| price)
                .ok_or_else(|| QuoteError::NoPrice {
                    source_name: "Table",
                    ticker: ticker.to_string(),
                })
        }
    }

    fn holding(ticker: &str, price: f64) -> Holding {
        Holding {
            ticker: ticker.to_string(),
            shares: 1.0,
            price,
            kind: HoldingType::Etf,
            purchase_date: None,
        }
    }

    #[tokio::test]
    async fn refresh_holdings_updates_known_tickers_and_keeps_the_rest() {
        let lookup = FallbackPriceLookup::new(vec![Box::new(TableSource(vec![("VOO", 480.126)]))]);
        let mut holdings = vec![
            holding("VOO", 450.0),
            holding("ZZZZ", 12.5),
            holding("brk.b", 7.0),
        ];

        let updated = lookup.refresh_holdings(&mut holdings).await;
        assert_eq!(updated, 1);
        assert_eq!(holdings[0].price, 480.13);
        assert_eq!(holdings[1].price, 12.5);
        assert_eq!(holdings[2].price, 7.0);
    }

    #[test]
    fn settings_without_key_use_yahoo_only() {
        let settings = QuoteSettings {
            finnhub_api_key: Some(String::new()),
            timeout: std::time::Duration::from_secs(1),
        };
        let lookup = FallbackPriceLookup::from_settings(&settings).expect("client builds");
        assert_eq!(lookup.source_names(), vec!["Yahoo"]);

        let settings = QuoteSettings {
            finnhub_api_key: Some("key".to_string()),
            ..settings
        };
        let lookup = FallbackPriceLookup::from_settings(&settings).expect("client builds");
        assert_eq!(lookup.source_names(), vec!["Finnhub", "Yahoo"]);
    }
}
