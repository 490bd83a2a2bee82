use hybridcrawl_core::{cancel_pair, ErrorKind, FetchConfig, FetchOutcome};
use hybridcrawl_fetch_static::StaticFetcher;
use url::Url;

fn fast_config() -> FetchConfig {
    // Retry backoff is 1500ms × attempt; keep retries at the default (2) but
    // the tests below only exercise a single retryable round so this stays
    // well under the suite's time budget.
    FetchConfig {
        max_retries: 2,
        ..FetchConfig::default()
    }
}

#[tokio::test]
async fn success_response_is_parsed() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/ok")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("<html><title>ok</title></html>")
        .create_async()
        .await;

    let config = fast_config();
    let fetcher = StaticFetcher::new(&config).unwrap();
    let (_handle, token) = cancel_pair();
    let url = Url::parse(&format!("{}/ok", server.url())).unwrap();

    match fetcher.fetch(&url, &config, &token).await {
        FetchOutcome::Success { status, body, content_type, .. } => {
            assert_eq!(status, 200);
            assert_eq!(content_type.as_deref(), Some("text/html"));
            assert!(String::from_utf8_lossy(&body).contains("ok"));
        }
        FetchOutcome::Failure { kind, message, .. } => panic!("expected success, got {kind:?}: {message}"),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/missing")
        .with_status(404)
        .expect(1)
        .create_async()
        .await;

    let config = fast_config();
    let fetcher = StaticFetcher::new(&config).unwrap();
    let (_handle, token) = cancel_pair();
    let url = Url::parse(&format!("{}/missing", server.url())).unwrap();

    match fetcher.fetch(&url, &config, &token).await {
        FetchOutcome::Failure { kind, .. } => assert_eq!(kind, ErrorKind::Http4xx),
        FetchOutcome::Success { .. } => panic!("expected a classified 404 failure"),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn persistent_rate_limit_retries_up_to_budget_then_fails() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/limited")
        .with_status(429)
        .expect(2)
        .create_async()
        .await;

    let config = fast_config();
    let fetcher = StaticFetcher::new(&config).unwrap();
    let (_handle, token) = cancel_pair();
    let url = Url::parse(&format!("{}/limited", server.url())).unwrap();

    match fetcher.fetch(&url, &config, &token).await {
        FetchOutcome::Failure { kind, .. } => assert_eq!(kind, ErrorKind::RateLimited),
        FetchOutcome::Success { .. } => panic!("expected a classified 429 failure"),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn cancellation_short_circuits_before_any_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server.mock("GET", "/unused").expect(0).create_async().await;

    let config = fast_config();
    let fetcher = StaticFetcher::new(&config).unwrap();
    let (handle, token) = cancel_pair();
    handle.cancel();
    let url = Url::parse(&format!("{}/unused", server.url())).unwrap();

    let outcome = fetcher.fetch(&url, &config, &token).await;
    assert!(!outcome.is_success());
    mock.assert_async().await;
}
