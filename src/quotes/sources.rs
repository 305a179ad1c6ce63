use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{PriceSource, QuoteError};

const FINNHUB_QUOTE_URL: &str = "https://finnhub.io/api/v1/quote";
const YAHOO_CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = concat!("allocator/", env!("CARGO_PKG_VERSION"));

fn http_client(timeout: Duration) -> Result<Client, QuoteError> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?)
}

#[derive(Debug, Deserialize)]
pub(crate) struct FinnhubQuote {
    /// Current price.
    c: Option<f64>,
}

impl FinnhubQuote {
    /// Finnhub answers unknown symbols with `c: 0`.
    fn usable_price(&self) -> Option<f64> {
        self.c.filter(|price| price.is_finite() && *price > 0.0)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct YahooChart {
    chart: YahooChartBody,
}

#[derive(Debug, Deserialize)]
struct YahooChartBody {
    #[serde(default)]
    result: Option<Vec<YahooChartResult>>,
}

#[derive(Debug, Deserialize)]
struct YahooChartResult {
    meta: YahooMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooMeta {
    regular_market_price: Option<f64>,
}

impl YahooChart {
    fn usable_price(&self) -> Option<f64> {
        self.chart
            .result
            .as_ref()?
            .first()?
            .meta
            .regular_market_price
            .filter(|price| price.is_finite() && *price != 0.0)
    }
}

pub struct FinnhubSource {
    client: Client,
    api_key: String,
}

impl FinnhubSource {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self, QuoteError> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl PriceSource for FinnhubSource {
    fn name(&self) -> &'static str {
        "Finnhub"
    }

    async fn latest_price(&self, ticker: &str) -> Result<f64, QuoteError> {
        let response = self
            .client
            .get(FINNHUB_QUOTE_URL)
            .query(&[("symbol", ticker), ("token", self.api_key.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(QuoteError::Status {
                source_name: self.name(),
                status: response.status().as_u16(),
            });
        }
        let quote: FinnhubQuote = response.json().await?;
        quote.usable_price().ok_or_else(|| QuoteError::NoPrice {
            source_name: self.name(),
            ticker: ticker.to_string(),
        })
    }
}

pub struct YahooSource {
    client: Client,
}

impl YahooSource {
    pub fn new(timeout: Duration) -> Result<Self, QuoteError> {
        Ok(Self {
            client: http_client(timeout)?,
        })
    }
}

#[async_trait]
impl PriceSource for YahooSource {
    fn name(&self) -> &'static str {
        "Yahoo"
    }

    async fn latest_price(&self, ticker: &str) -> Result<f64, QuoteError> {
        let response = self
            .client
            .get(format!("{YAHOO_CHART_URL}/{ticker}"))
            .query(&[("interval", "1d"), ("range", "1d")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(QuoteError::Status {
                source_name: self.name(),
                status: response.status().as_u16(),
            });
        }
        let chart: YahooChart = response.json().await?;
        chart.usable_price().ok_or_else(|| QuoteError::NoPrice {
            source_name: self.name(),
            ticker: ticker.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finnhub_zero_quote_is_not_a_price() {
        let quote: FinnhubQuote =
            serde_json::from_str(r#"{"c":0,"d":null,"h":0,"l":0,"o":0,"pc":0}"#).expect("parses");
        assert_eq!(quote.usable_price(), None);

        let quote: FinnhubQuote =
            serde_json::from_str(r#"{"c":189.84,"h":191.0,"l":188.2}"#).expect("parses");
        assert_eq!(quote.usable_price(), Some(189.84));
    }

    #[test]
    fn yahoo_price_read_from_first_chart_result() {
        let chart: YahooChart = serde_json::from_str(
            r#"{"chart":{"result":[{"meta":{"currency":"USD","regularMarketPrice":512.07}}],
                "error":null}}"#,
        )
        .expect("parses");
        assert_eq!(chart.usable_price(), Some(512.07));
    }

    #[test]
    fn yahoo_missing_result_has_no_price() {
        let chart: YahooChart = serde_json::from_str(
            r#"{"chart":{"result":null,
                "error":{"code":"Not Found","description":"No data found"}}}"#,
        )
        .expect("parses");
        assert_eq!(chart.usable_price(), None);

        let chart: YahooChart =
            serde_json::from_str(r#"{"chart":{"result":[{"meta":{}}]}}"#).expect("parses");
        assert_eq!(chart.usable_price(), None);
    }
}
