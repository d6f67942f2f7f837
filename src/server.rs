//! Rate server: `GET /cotacao` fetches the upstream bid, stores it, and
//! returns it as `{"value": <number>}`.

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::core::config::ServerConfig;
use crate::core::{QuoteProvider, QuoteResponse, RateError};
use crate::providers::AwesomeApiProvider;
use crate::store::{QuoteStore, SqliteStore};

pub const FETCH_DEADLINE: Duration = Duration::from_millis(200);
pub const PERSIST_DEADLINE: Duration = Duration::from_millis(10);

/// Per-stage deadlines. Each starts when its stage starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadlines {
    pub fetch: Duration,
    pub persist: Duration,
}

impl Default for Deadlines {
    fn default() -> Self {
        Self {
            fetch: FETCH_DEADLINE,
            persist: PERSIST_DEADLINE,
        }
    }
}

/// Shared handler state, built once at startup.
pub struct AppState {
    pub provider: Arc<dyn QuoteProvider>,
    pub store: Arc<dyn QuoteStore>,
    pub deadlines: Deadlines,
}

impl AppState {
    pub fn new(provider: Arc<dyn QuoteProvider>, store: Arc<dyn QuoteStore>) -> Self {
        Self {
            provider,
            store,
            deadlines: Deadlines::default(),
        }
    }

    pub fn with_deadlines(mut self, deadlines: Deadlines) -> Self {
        self.deadlines = deadlines;
        self
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/cotacao", get(get_quote))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Fetch, persist, encode. Any stage failing ends the request with a 500.
pub async fn get_quote(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, RateError> {
    let quote = timeout(state.deadlines.fetch, state.provider.fetch_quote())
        .await
        .map_err(|_| RateError::fetch_deadline(state.deadlines.fetch))??;
    debug!(bid = quote.bid, "Fetched quote");

    let id = state
        .store
        .save(quote.bid, state.deadlines.persist)
        .await?;
    debug!(id, "Persisted quote");

    let body = serde_json::to_string(&QuoteResponse { value: quote.bid })?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body))
}

/// Serves the router on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}

/// Opens the store, binds the listener, and serves until Ctrl-C.
pub async fn run(config: &ServerConfig) -> Result<()> {
    let store = SqliteStore::open(&config.database_path).await?;
    let provider = AwesomeApiProvider::new(&config.provider.base_url)
        .context("Failed to build upstream HTTP client")?;

    let state = Arc::new(AppState::new(
        Arc::new(provider),
        Arc::new(store.clone()),
    ));

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!("Rate server listening on http://{}/cotacao", config.listen_addr);

    let result = serve(listener, state, shutdown_signal()).await;
    store.close().await;
    info!("Database closed");
    result
}
