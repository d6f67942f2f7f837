pub mod sqlite;

use crate::core::RateError;
use async_trait::async_trait;
use std::time::Duration;

pub use sqlite::SqliteStore;

/// Append-only sink for fetched quotes.
#[async_trait]
pub trait QuoteStore: Send + Sync {
    /// Appends one row holding `value` and returns its id.
    ///
    /// `deadline` bounds the work up to the commit. A save that misses it
    /// returns a persist error and leaves no row; a commit that has been
    /// issued always runs to completion and counts as success.
    async fn save(&self, value: f64, deadline: Duration) -> Result<i64, RateError>;
}
