//! Quote abstractions and core types

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::error::RateError;

/// A bid parsed from the upstream payload. Lives for one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExchangeQuote {
    pub bid: f64,
}

/// A persisted quote row. Rows are append-only.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ExchangeRecord {
    pub id: i64,
    pub created_at: NaiveDateTime,
    pub value: f64,
}

/// Body of `GET /cotacao`, shared by server and client.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub value: f64,
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_quote(&self) -> Result<ExchangeQuote, RateError>;
}
