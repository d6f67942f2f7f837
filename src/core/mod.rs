//! Core business logic abstractions

pub mod config;
pub mod error;
pub mod log;
pub mod quote;

// Re-export main types for cleaner imports
pub use error::RateError;
pub use quote::{ExchangeQuote, ExchangeRecord, QuoteProvider, QuoteResponse};
