//! NDJSON `EventSink` that writes one JSON object per line to stdout. This
//! is the CLI's stand-in for the real-time transport collaborator spec.md
//! §1 treats as external: the core only ever publishes to a caller-supplied
//! sink, and this is the simplest sink that satisfies that contract.

use hybridcrawl_core::{Event, EventSink};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

pub struct NdjsonSink;

impl EventSink for NdjsonSink {
    fn publish(&self, event: Event) {
        let value = event_to_json(&event);
        match serde_json::to_string(&value) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(error = %e, "failed to serialize event, dropping"),
        }
    }
}

/// `Event` doesn't derive `Serialize` directly (its variants carry
/// `ErrorKind`/`FetchMethod`, which already serialize via `core::types`);
/// this maps each variant to a tagged JSON object rather than adding a
/// blanket derive that would need to special-case every payload shape.
fn event_to_json(event: &Event) -> serde_json::Value {
    match event {
        Event::CrawlStart {
            session_id,
            seed_url,
            max_depth,
            crawl_type,
            credential_context,
            timestamp,
        } => json!({
            "event": "crawl:start",
            "sessionId": session_id,
            "seedUrl": seed_url,
            "maxDepth": max_depth,
            "crawlType": serde_value(crawl_type),
            "credentialContext": credential_context,
            "timestamp": timestamp,
        }),
        Event::MethodDetected {
            url,
            method,
            reason,
            timestamp,
        } => json!({
            "event": "crawl:method-detected",
            "url": url,
            "method": serde_value(method),
            "reason": reason,
            "timestamp": timestamp,
        }),
        Event::Progress {
            percentage,
            pages_processed,
            total_estimate,
            current_url,
            status,
        } => json!({
            "event": "crawl:progress",
            "percentage": percentage,
            "pagesProcessed": pages_processed,
            "totalEstimate": total_estimate,
            "currentUrl": current_url,
            "status": status,
        }),
        Event::DepthChange {
            current_depth,
            max_depth,
            pages_at_this_depth,
            timestamp,
        } => json!({
            "event": "crawl:depth-change",
            "currentDepth": current_depth,
            "maxDepth": max_depth,
            "pagesAtThisDepth": pages_at_this_depth,
            "timestamp": timestamp,
        }),
        Event::LinkFound {
            url,
            source_url,
            depth,
            link_count,
        } => json!({
            "event": "crawl:link-found",
            "url": url,
            "sourceUrl": source_url,
            "depth": depth,
            "linkCount": link_count,
        }),
        Event::Error {
            session_id,
            error_kind,
            error_message,
            failed_url,
            fatal,
            depth,
            timestamp,
        } => json!({
            "event": "crawl:error",
            "sessionId": session_id,
            "errorKind": serde_value(error_kind),
            "errorMessage": error_message,
            "failedUrl": failed_url,
            "fatal": fatal,
            "depth": depth,
            "timestamp": timestamp,
        }),
        Event::Complete {
            session_id,
            total_pages,
            total_links,
            duration_ms,
            method,
            max_depth_reached,
            success_rate,
            average_response_time_ms,
            unique_domains,
            credential_context,
            timestamp,
        } => json!({
            "event": "crawl:complete",
            "sessionId": session_id,
            "totalPages": total_pages,
            "totalLinks": total_links,
            "durationMs": duration_ms,
            "method": method.map(serde_value),
            "maxDepthReached": max_depth_reached,
            "successRate": success_rate,
            "averageResponseTimeMs": average_response_time_ms,
            "uniqueDomains": unique_domains,
            "credentialContext": credential_context,
            "timestamp": timestamp,
        }),
    }
}

fn serde_value<T: Serialize>(value: T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}
