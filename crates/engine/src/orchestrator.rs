//! The hybrid orchestrator: per-URL method choice, fallback, and result
//! normalization (spec.md §4.6). Grounded directly on spec.md — the
//! teacher has no static/dynamic choice to generalize from, only
//! network-driver dispatch by URL scheme/TLD (`NetworkDriver::can_handle`),
//! which is the shape `choose_method` below generalizes: a pure decision
//! function plus a straight-line switch (spec.md §9 "dynamic dispatch over
//! fetcher choice" redesign flag), not a trait-object hierarchy.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use hybridcrawl_core::{
    classify_message, CancelToken, CrawlType, DetectionVerdict, Event, EventSink, FetchMethod,
    FetchOutcome, ForceMethod, Options, PageDiagnostics, PageError, PageMetadata, PageResult,
};
use hybridcrawl_detect as detect;
use hybridcrawl_fetch_dynamic::DynamicFetcher;
use hybridcrawl_fetch_static::StaticFetcher;
use hybridcrawl_parser as parser;
use url::Url;

/// One fetch method's worth of work has already happened; this says what
/// to do next. Spec.md §9: a pure function over the static result rather
/// than a dispatch table.
enum NextStep {
    ReturnStatic,
    UseDynamic { reason: String },
}

fn choose_method(
    opts: &Options,
    static_outcome: &FetchOutcome,
    link_count: usize,
    verdict: Option<&DetectionVerdict>,
) -> NextStep {
    match static_outcome {
        FetchOutcome::Failure { kind, .. } => NextStep::UseDynamic {
            reason: format!("static error: {kind:?}"),
        },
        FetchOutcome::Success { .. } => {
            if link_count == 0 {
                return NextStep::UseDynamic {
                    reason: "empty static result".to_string(),
                };
            }
            match verdict {
                Some(v) if v.needs_dynamic && v.confidence >= opts.detection_threshold => {
                    NextStep::UseDynamic {
                        reason: v.reason.clone(),
                    }
                }
                _ => NextStep::ReturnStatic,
            }
        }
    }
}

/// `CrawlOne(url, opts, sink, cancel) -> PageResult`. Never raises: fatal
/// failures surface as `PageResult { success: false, .. }`.
pub async fn crawl_one(
    static_fetcher: &StaticFetcher,
    dynamic_fetcher: &DynamicFetcher,
    url_str: &str,
    opts: &Options,
    sink: &Arc<dyn EventSink>,
    cancel: &CancelToken,
) -> PageResult {
    let start = Instant::now();

    let url = match hybridcrawl_core::validate_absolute(url_str) {
        Ok(url) => url,
        Err(_) => return invalid_url_result(url_str, opts.credential_context.clone()),
    };

    if cancel.is_cancelled() {
        return cancelled_result(&url, opts.credential_context.clone());
    }

    let fetch_config = opts.fetch_config();

    match opts.force_method {
        ForceMethod::Dynamic => {
            publish_method_detected(sink, &url, FetchMethod::Dynamic, "forced");
            let outcome = dynamic_fetcher.fetch(&url, &fetch_config).await;
            build_result(&url, FetchMethod::Dynamic, outcome, None, start, opts)
        }
        ForceMethod::Static => {
            publish_method_detected(sink, &url, FetchMethod::Static, "forced");
            let outcome = static_fetcher.fetch(&url, &fetch_config, cancel).await;
            build_result(&url, FetchMethod::Static, outcome, None, start, opts)
        }
        ForceMethod::Auto => {
            publish_method_detected(sink, &url, FetchMethod::Static, "initial fast path");
            let static_outcome = static_fetcher.fetch(&url, &fetch_config, cancel).await;

            let (link_count, verdict) = match &static_outcome {
                FetchOutcome::Success {
                    body, content_type, ..
                } => {
                    let extracted = parser::extract(body, &url, content_type.clone());
                    let html = String::from_utf8_lossy(body);
                    let verdict = detect::detect(&html, extracted.links.len());
                    (extracted.links.len(), Some(verdict))
                }
                FetchOutcome::Failure { .. } => (0, None),
            };

            match choose_method(opts, &static_outcome, link_count, verdict.as_ref()) {
                NextStep::ReturnStatic => {
                    build_result(&url, FetchMethod::Static, static_outcome, verdict, start, opts)
                }
                NextStep::UseDynamic { reason } => {
                    publish_method_detected(sink, &url, FetchMethod::Dynamic, &reason);
                    let outcome = dynamic_fetcher.fetch(&url, &fetch_config).await;
                    build_result(&url, FetchMethod::Dynamic, outcome, None, start, opts)
                }
            }
        }
    }
}

/// Wraps `crawl_one` with the session-lifecycle events spec.md §5/§6
/// require around every public crawl operation, not just the recursive
/// one: exactly one `crawl:start` (crawlType:single) before anything
/// else, exactly one `crawl:complete` last. Used by the engine's
/// `crawl_one` and by `crawl_batch` (one independent single-crawl
/// lifecycle per URL, since batch shares no session across URLs); the
/// recursive scheduler calls bare `crawl_one` instead and publishes its
/// own session-level start/complete pair around the whole traversal.
pub async fn crawl_one_session(
    static_fetcher: &StaticFetcher,
    dynamic_fetcher: &DynamicFetcher,
    url_str: &str,
    opts: &Options,
    sink: &Arc<dyn EventSink>,
    cancel: &CancelToken,
) -> PageResult {
    let session_id = uuid::Uuid::new_v4().to_string();
    let wall_start = Instant::now();

    sink.publish(Event::CrawlStart {
        session_id: session_id.clone(),
        seed_url: url_str.to_string(),
        max_depth: 0,
        crawl_type: CrawlType::Single,
        credential_context: opts.credential_context.clone(),
        timestamp: Utc::now(),
    });

    let result = crawl_one(static_fetcher, dynamic_fetcher, url_str, opts, sink, cancel).await;

    sink.publish(Event::Complete {
        session_id,
        total_pages: 1,
        total_links: result.links.len(),
        duration_ms: wall_start.elapsed().as_millis() as u64,
        method: Some(result.fetch_method),
        max_depth_reached: Some(0),
        success_rate: Some(if result.success { 1.0 } else { 0.0 }),
        average_response_time_ms: Some(result.diagnostics.duration_ms as f64),
        unique_domains: Some(1),
        credential_context: opts.credential_context.clone(),
        timestamp: Utc::now(),
    });

    result
}

fn publish_method_detected(sink: &Arc<dyn EventSink>, url: &Url, method: FetchMethod, reason: &str) {
    sink.publish(Event::MethodDetected {
        url: url.to_string(),
        method,
        reason: reason.to_string(),
        timestamp: Utc::now(),
    });
}

/// Turn a `FetchOutcome` into the `PageResult` the orchestrator returns,
/// re-running extraction/detection for the dynamic path (the static path's
/// extraction was already done to feed the detector, so it's reused here
/// via a second `parser::extract` call only when `verdict` is `None` and
/// the outcome succeeded — i.e. exactly the dynamic-fetch and
/// forced-method cases).
fn build_result(
    url: &Url,
    method: FetchMethod,
    outcome: FetchOutcome,
    verdict: Option<DetectionVerdict>,
    start: Instant,
    opts: &Options,
) -> PageResult {
    match outcome {
        FetchOutcome::Success {
            final_url,
            status,
            body,
            content_type,
            response_size,
            tls_info,
            duration,
            ..
        } => {
            let extracted = parser::extract(&body, &final_url, content_type);
            PageResult {
                url: url.to_string(),
                final_url: final_url.to_string(),
                title: extracted.title,
                links: extracted.links.into_iter().map(|u| u.to_string()).collect(),
                metadata: extracted.metadata,
                fetch_method: method,
                diagnostics: PageDiagnostics {
                    duration_ms: duration.as_millis() as u64,
                    status_code: Some(status),
                    response_size,
                    tls_info,
                },
                detection: verdict,
                success: true,
                error: None,
                credential_context: opts.credential_context.clone(),
            }
        }
        FetchOutcome::Failure { kind, message, duration } => {
            let _ = start;
            PageResult {
                url: url.to_string(),
                final_url: url.to_string(),
                title: None,
                links: Vec::new(),
                metadata: PageMetadata::default(),
                fetch_method: method,
                diagnostics: PageDiagnostics {
                    duration_ms: duration.as_millis() as u64,
                    status_code: None,
                    response_size: 0,
                    tls_info: None,
                },
                detection: verdict,
                success: false,
                error: Some(PageError { kind, message }),
                credential_context: opts.credential_context.clone(),
            }
        }
    }
}

fn invalid_url_result(url_str: &str, credential_context: Option<String>) -> PageResult {
    let kind = classify_message("invalid url", None);
    PageResult {
        url: url_str.to_string(),
        final_url: url_str.to_string(),
        title: None,
        links: Vec::new(),
        metadata: PageMetadata::default(),
        fetch_method: FetchMethod::Static,
        diagnostics: PageDiagnostics {
            duration_ms: 0,
            status_code: None,
            response_size: 0,
            tls_info: None,
        },
        detection: None,
        success: false,
        error: Some(PageError {
            kind,
            message: format!("invalid URL: {url_str}"),
        }),
        credential_context,
    }
}

fn cancelled_result(url: &Url, credential_context: Option<String>) -> PageResult {
    PageResult {
        url: url.to_string(),
        final_url: url.to_string(),
        title: None,
        links: Vec::new(),
        metadata: PageMetadata::default(),
        fetch_method: FetchMethod::Static,
        diagnostics: PageDiagnostics {
            duration_ms: 0,
            status_code: None,
            response_size: 0,
            tls_info: None,
        },
        detection: None,
        success: false,
        error: Some(PageError {
            kind: hybridcrawl_core::ErrorKind::Unknown,
            message: "cancelled".to_string(),
        }),
        credential_context,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hybridcrawl_core::{DetectionMetrics, Framework};
    use std::time::Duration;

    fn success_outcome(body: &str) -> FetchOutcome {
        FetchOutcome::Success {
            final_url: Url::parse("https://example.test/").unwrap(),
            status: 200,
            body: body.as_bytes().to_vec(),
            content_type: Some("text/html".to_string()),
            response_size: body.len(),
            tls_info: None,
            duration: Duration::from_millis(10),
            headers: Default::default(),
        }
    }

    fn verdict(needs_dynamic: bool, confidence: f64) -> DetectionVerdict {
        DetectionVerdict {
            needs_dynamic,
            confidence,
            reason: "test".to_string(),
            framework: Framework::None,
            metrics: DetectionMetrics {
                link_count: 0,
                script_count: 0,
                text_length: 0,
                script_to_content_ratio: 0.0,
            },
        }
    }

    #[test]
    fn zero_links_triggers_dynamic_with_empty_result_reason() {
        let opts = Options::default();
        let outcome = success_outcome("<html></html>");
        match choose_method(&opts, &outcome, 0, None) {
            NextStep::UseDynamic { reason } => assert_eq!(reason, "empty static result"),
            NextStep::ReturnStatic => panic!("expected dynamic fallback"),
        }
    }

    #[test]
    fn static_error_triggers_dynamic_with_error_kind_reason() {
        let opts = Options::default();
        let outcome = FetchOutcome::Failure {
            kind: hybridcrawl_core::ErrorKind::Timeout,
            message: "boom".to_string(),
            duration: Duration::from_millis(1),
        };
        match choose_method(&opts, &outcome, 0, None) {
            NextStep::UseDynamic { reason } => assert!(reason.contains("Timeout")),
            NextStep::ReturnStatic => panic!("expected dynamic fallback"),
        }
    }

    #[test]
    fn high_confidence_verdict_triggers_dynamic() {
        let opts = Options::default();
        let outcome = success_outcome("<html>content</html>");
        let v = verdict(true, 0.9);
        match choose_method(&opts, &outcome, 3, Some(&v)) {
            NextStep::UseDynamic { .. } => {}
            NextStep::ReturnStatic => panic!("expected dynamic fallback"),
        }
    }

    #[test]
    fn low_confidence_verdict_keeps_static() {
        let opts = Options::default();
        let outcome = success_outcome("<html>content</html>");
        let v = verdict(false, 0.1);
        match choose_method(&opts, &outcome, 3, Some(&v)) {
            NextStep::ReturnStatic => {}
            NextStep::UseDynamic { .. } => panic!("expected static result to stand"),
        }
    }
}
