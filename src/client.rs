//! Quote client: one request to the rate server, one file write.

use std::path::Path;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::core::config::ClientConfig;
use crate::core::{QuoteResponse, RateError};

pub const CLIENT_DEADLINE: Duration = Duration::from_millis(300);

/// Renders the output file content. No trailing newline.
pub fn format_quote(value: f64) -> String {
    format!("Dólar: {value:.4}")
}

pub struct QuoteClient {
    server_url: String,
    client: reqwest::Client,
    deadline: Duration,
}

impl QuoteClient {
    pub fn new(server_url: &str) -> Result<Self, RateError> {
        let client = reqwest::Client::builder()
            .user_agent("cotacao/0.1")
            .build()
            .map_err(RateError::client)?;
        Ok(Self {
            server_url: server_url.trim_end_matches('/').to_string(),
            client,
            deadline: CLIENT_DEADLINE,
        })
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Requests `/cotacao` and decodes the value, all within the deadline.
    pub async fn fetch_value(&self) -> Result<f64, RateError> {
        timeout(self.deadline, self.request())
            .await
            .map_err(|_| RateError::client_deadline(self.deadline))?
    }

    async fn request(&self) -> Result<f64, RateError> {
        let url = format!("{}/cotacao", self.server_url);
        debug!("Requesting quote from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RateError::Client(format!("Request error: {e} URL: {url}")))?;

        let status = response.status();
        let text = response.text().await.map_err(RateError::client)?;
        if !status.is_success() {
            return Err(RateError::Client(format!(
                "HTTP error: {status}: {}",
                text.trim()
            )));
        }

        let data: QuoteResponse = serde_json::from_str(&text)
            .map_err(|e| RateError::Client(format!("Failed to parse quote response: {e}")))?;
        Ok(data.value)
    }

    /// Fetches the value and overwrites `output` with the formatted quote.
    /// Nothing is written unless a value was decoded.
    pub async fn fetch_and_write<P: AsRef<Path>>(&self, output: P) -> Result<f64, RateError> {
        let value = self.fetch_value().await?;
        let output = output.as_ref();
        tokio::fs::write(output, format_quote(value))
            .await
            .map_err(|e| {
                RateError::Client(format!("Failed to write {}: {e}", output.display()))
            })?;
        Ok(value)
    }
}

pub async fn run(config: &ClientConfig) -> Result<f64, RateError> {
    let client = QuoteClient::new(&config.server_url)?;
    let value = client.fetch_and_write(&config.output_path).await?;
    info!(value, "Wrote quote to {}", config.output_path);
    Ok(value)
}
