use cotacao::client::QuoteClient;
use cotacao::core::RateError;
use cotacao::providers::AwesomeApiProvider;
use cotacao::server::{AppState, Deadlines, FETCH_DEADLINE, serve};
use cotacao::store::SqliteStore;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};

mod test_utils {
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_upstream_mock(bid: &str, delay: Duration) -> MockServer {
        let mock_server = MockServer::start().await;
        let body = format!(r#"{{"USDBRL": {{"code": "USD", "codein": "BRL", "bid": "{bid}"}}}}"#);

        Mock::given(method("GET"))
            .and(path("/json/last/USD-BRL"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(body)
                    .set_delay(delay),
            )
            .mount(&mock_server)
            .await;

        mock_server
    }
}

// Starts a server on an ephemeral port and returns its base URL.
async fn start_server(upstream: &str, store: SqliteStore) -> String {
    let provider = AwesomeApiProvider::new(upstream).expect("Failed to build provider");
    // Generous persist deadline so disk latency on CI does not flake
    let state = Arc::new(
        AppState::new(Arc::new(provider), Arc::new(store)).with_deadlines(Deadlines {
            fetch: FETCH_DEADLINE,
            persist: Duration::from_secs(2),
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, state, std::future::pending()));
    format!("http://{addr}")
}

#[test_log::test(tokio::test)]
async fn test_full_flow_writes_file_and_row() {
    let upstream = test_utils::create_upstream_mock("5.1234", Duration::ZERO).await;
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(dir.path().join("exchange.db"))
        .await
        .unwrap();
    let server_url = start_server(&upstream.uri(), store.clone()).await;

    let output = dir.path().join("cotacao.txt");
    let client = QuoteClient::new(&server_url)
        .unwrap()
        .with_deadline(Duration::from_secs(2));
    let value = client.fetch_and_write(&output).await.unwrap();
    info!(?value, "Client received quote");

    assert_eq!(value, 5.1234);
    assert_eq!(fs::read_to_string(&output).unwrap(), "Dólar: 5.1234");

    assert_eq!(store.count().await.unwrap(), 1);
    let record = store.latest().await.unwrap().expect("Row should exist");
    assert_eq!(record.value, value);
}

#[test_log::test(tokio::test)]
async fn test_repeated_requests_append_rows() {
    let upstream = test_utils::create_upstream_mock("5.4321", Duration::ZERO).await;
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(dir.path().join("exchange.db"))
        .await
        .unwrap();
    let server_url = start_server(&upstream.uri(), store.clone()).await;

    let client = QuoteClient::new(&server_url)
        .unwrap()
        .with_deadline(Duration::from_secs(2));
    for _ in 0..3 {
        assert_eq!(client.fetch_value().await.unwrap(), 5.4321);
    }
    assert_eq!(store.count().await.unwrap(), 3);
}

#[test_log::test(tokio::test)]
async fn test_slow_upstream_stores_nothing() {
    let upstream = test_utils::create_upstream_mock("5.1234", Duration::from_millis(500)).await;
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(dir.path().join("exchange.db"))
        .await
        .unwrap();
    let server_url = start_server(&upstream.uri(), store.clone()).await;

    let output = dir.path().join("cotacao.txt");
    let client = QuoteClient::new(&server_url)
        .unwrap()
        .with_deadline(Duration::from_secs(2));
    let err = client.fetch_and_write(&output).await.unwrap_err();

    assert!(matches!(err, RateError::Client(_)));
    assert!(
        err.to_string()
            .contains("fetch failed: deadline of 200ms exceeded")
    );
    assert!(!output.exists());
    assert_eq!(store.count().await.unwrap(), 0);
}

#[test_log::test(tokio::test)]
async fn test_config_file_drives_client() {
    let mock_server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path("/cotacao"))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(r#"{"value": 5.1}"#))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("cotacao.txt");
    let config_path = dir.path().join("config.yaml");
    let config_content = format!(
        r#"
        client:
          server_url: {}
          output_path: {}
    "#,
        mock_server.uri(),
        output.display()
    );
    fs::write(&config_path, &config_content).expect("Failed to write config file");

    let result =
        cotacao::run_command(cotacao::AppCommand::Client, Some(config_path.to_str().unwrap()))
            .await;
    assert!(
        result.is_ok(),
        "Client command failed with: {:?}",
        result.err()
    );
    assert_eq!(fs::read_to_string(&output).unwrap(), "Dólar: 5.1000");
}

#[test_log::test(tokio::test)]
#[ignore = "requires network access to economia.awesomeapi.com.br"]
async fn test_real_awesome_api() {
    use cotacao::core::QuoteProvider;

    let provider = AwesomeApiProvider::new(cotacao::core::config::DEFAULT_PROVIDER_URL).unwrap();
    match provider.fetch_quote().await {
        Ok(quote) => {
            info!(?quote, "Received successful quote response");
            assert!(quote.bid > 0.0, "Bid should be positive");
        }
        Err(e) => {
            error!("Quote API request failed: {e}\n{e:?}");
            panic!("Quote API request failed: {e}");
        }
    }
}
