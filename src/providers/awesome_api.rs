use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::{ExchangeQuote, QuoteProvider, RateError};

const CURRENCY_PAIR: &str = "USD-BRL";

#[derive(Debug, Deserialize)]
struct AwesomeApiResponse {
    #[serde(rename = "USDBRL")]
    usdbrl: PairQuote,
}

// Only `bid` is required. The optional fields are never read, only printed
// through `Debug` when the quote is logged.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct PairQuote {
    bid: String,
    code: Option<String>,
    codein: Option<String>,
    ask: Option<String>,
    create_date: Option<String>,
}

fn parse_bid(bid: &str) -> Result<f64, RateError> {
    let value: f64 = bid
        .parse()
        .map_err(|e| RateError::Fetch(format!("Invalid bid {bid:?}: {e}")))?;
    if !value.is_finite() {
        return Err(RateError::Fetch(format!("Invalid bid {bid:?}: not finite")));
    }
    Ok(value)
}

// AwesomeApiProvider implementation for QuoteProvider
pub struct AwesomeApiProvider {
    base_url: String,
    client: reqwest::Client,
}

impl AwesomeApiProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("cotacao/0.1")
            .build()?;
        Ok(AwesomeApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl QuoteProvider for AwesomeApiProvider {
    #[instrument(name = "AwesomeApiFetch", skip(self), fields(pair = CURRENCY_PAIR))]
    async fn fetch_quote(&self) -> Result<ExchangeQuote, RateError> {
        let url = format!("{}/json/last/{}", self.base_url, CURRENCY_PAIR);
        debug!("Requesting exchange rate from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RateError::Fetch(format!("Request error: {e} URL: {url}")))?;

        if !response.status().is_success() {
            return Err(RateError::Fetch(format!(
                "HTTP error: {} for currency pair: {}",
                response.status(),
                CURRENCY_PAIR
            )));
        }

        let text = response.text().await.map_err(RateError::fetch)?;

        let data: AwesomeApiResponse = serde_json::from_str(&text).map_err(|e| {
            RateError::Fetch(format!(
                "Failed to parse JSON response for {CURRENCY_PAIR}: {e}"
            ))
        })?;
        debug!(quote = ?data.usdbrl, "Received upstream quote");

        let bid = parse_bid(&data.usdbrl.bid)?;
        Ok(ExchangeQuote { bid })
    }
}
