//! End-to-end scenario tests for the three public crawl operations,
//! against an in-process HTTP fixture server (`mockito`) standing in for
//! the literal example sites in spec.md §8.

use std::sync::Arc;

use hybridcrawl_core::{cancel_pair, CollectingSink, Event, ForceMethod, Options};
use hybridcrawl_engine::Engine;

fn opts_with(mutate: impl FnOnce(&mut Options)) -> Options {
    let mut opts = Options::default();
    mutate(&mut opts);
    opts
}

#[tokio::test]
async fn forced_static_crawl_extracts_title_and_links() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(
            r#"<html><head><title>Example</title></head><body>
                <a href="/a">A</a>
                <a href="/b">B</a>
                <a href="mailto:x@y">mail</a>
            </body></html>"#,
        )
        .create_async()
        .await;

    let opts = opts_with(|o| o.force_method = ForceMethod::Static);
    let engine = Engine::new(&opts).unwrap();
    let sink = CollectingSink::new();
    let (_handle, cancel) = cancel_pair();

    let result = engine
        .crawl_one(&server.url(), &opts, sink.clone() as Arc<dyn hybridcrawl_core::EventSink>, cancel)
        .await;

    assert!(result.success);
    assert_eq!(result.title.as_deref(), Some("Example"));
    assert_eq!(result.links.len(), 2);
    assert!(result.links.iter().any(|l| l.ends_with("/a")));
    assert!(result.links.iter().any(|l| l.ends_with("/b")));
    mock.assert_async().await;
}

#[tokio::test]
async fn static_4xx_is_reported_as_failure_without_retry() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/missing")
        .with_status(404)
        .expect(1)
        .create_async()
        .await;

    let opts = opts_with(|o| o.force_method = ForceMethod::Static);
    let engine = Engine::new(&opts).unwrap();
    let sink = CollectingSink::new();
    let (_handle, cancel) = cancel_pair();

    let url = format!("{}/missing", server.url());
    let result = engine
        .crawl_one(&url, &opts, sink.clone() as Arc<dyn hybridcrawl_core::EventSink>, cancel)
        .await;

    assert!(!result.success);
    assert_eq!(result.error.unwrap().kind, hybridcrawl_core::ErrorKind::Http4xx);
    mock.assert_async().await;
}

#[tokio::test]
async fn recursive_crawl_respects_depth_page_and_domain_caps() {
    let mut server = mockito::Server::new_async().await;
    let base = server.url();

    let root_body = format!(
        r#"<html><head><title>root</title></head><body>
            <a href="/a">a</a><a href="/b">b</a><a href="http://external.test/x">ext</a>
        </body></html>"#
    );
    let a_body = r#"<html><body><a href="/a1">a1</a><a href="/a2">a2</a></body></html>"#;
    let b_body = r#"<html><body><a href="/b1">b1</a></body></html>"#;
    let leaf_body = r#"<html><body>leaf</body></html>"#;

    let _m_root = server.mock("GET", "/").with_status(200).with_body(&root_body).create_async().await;
    let _m_a = server.mock("GET", "/a").with_status(200).with_body(a_body).create_async().await;
    let _m_b = server.mock("GET", "/b").with_status(200).with_body(b_body).create_async().await;
    let _m_a1 = server.mock("GET", "/a1").with_status(200).with_body(leaf_body).create_async().await;
    let _m_a2 = server.mock("GET", "/a2").with_status(200).with_body(leaf_body).create_async().await;
    let _m_b1 = server.mock("GET", "/b1").with_status(200).with_body(leaf_body).create_async().await;

    let opts = opts_with(|o| {
        o.force_method = ForceMethod::Static;
        o.limits.max_depth = 2;
        o.limits.max_pages = 5;
        o.limits.child_links_per_page = 2;
        o.limits.delay_ms = 500;
        o.limits.same_domain_only = true;
    });
    let engine = Engine::new(&opts).unwrap();
    let sink = CollectingSink::new();
    let (_handle, cancel) = cancel_pair();

    let session = engine
        .crawl_recursive(&base, &opts, sink.clone() as Arc<dyn hybridcrawl_core::EventSink>, cancel)
        .await;

    assert_eq!(session.results.len(), 5);
    assert_eq!(session.max_depth_reached, 2);
    assert!(session.results.iter().all(|r| r.depth <= 2));
    assert!(!session.results.iter().any(|r| r.page.url.contains("external.test")));

    let events = sink.events();
    assert!(matches!(events.first(), Some(Event::CrawlStart { .. })));
    assert!(matches!(events.last(), Some(Event::Complete { .. })));
}

#[tokio::test]
async fn max_depth_zero_visits_only_the_seed() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/")
        .with_status(200)
        .with_body(r#"<html><body><a href="/a">a</a></body></html>"#)
        .create_async()
        .await;

    let opts = opts_with(|o| {
        o.force_method = ForceMethod::Static;
        o.limits.max_depth = 0;
    });
    let engine = Engine::new(&opts).unwrap();
    let sink = CollectingSink::new();
    let (_handle, cancel) = cancel_pair();

    let session = engine
        .crawl_recursive(&server.url(), &opts, sink.clone() as Arc<dyn hybridcrawl_core::EventSink>, cancel)
        .await;

    assert_eq!(session.results.len(), 1);
    assert_eq!(session.results[0].depth, 0);
    mock.assert_async().await;
}

#[tokio::test]
async fn cancellation_mid_crawl_emits_fatal_error_then_complete() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/")
        .with_status(200)
        .with_body(r#"<html><body><a href="/a">a</a></body></html>"#)
        .create_async()
        .await;
    let _m2 = server
        .mock("GET", "/a")
        .with_status(200)
        .with_body("<html><body>leaf</body></html>")
        .create_async()
        .await;

    let opts = opts_with(|o| {
        o.force_method = ForceMethod::Static;
        o.limits.delay_ms = 500;
    });
    let engine = Engine::new(&opts).unwrap();
    let sink = CollectingSink::new();
    let (handle, cancel) = cancel_pair();
    handle.cancel();

    let session = engine
        .crawl_recursive(&server.url(), &opts, sink.clone() as Arc<dyn hybridcrawl_core::EventSink>, cancel)
        .await;

    assert!(session.cancelled);
    let events = sink.events();
    assert!(matches!(events.last(), Some(Event::Complete { .. })));
    let fatal_errors = events
        .iter()
        .filter(|e| matches!(e, Event::Error { fatal: true, .. }))
        .count();
    assert_eq!(fatal_errors, 1);
}
