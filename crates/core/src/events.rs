//! Lifecycle events and the sink they are published through. Replaces the
//! "singleton transport" the teacher's codebase wires up as a module-level
//! channel (spec.md §9 redesign flag): every crawl operation takes an
//! `Arc<dyn EventSink>` instead of reaching for global state.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::types::{CrawlType, FetchMethod};
use crate::ErrorKind;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    CrawlStart {
        session_id: String,
        seed_url: String,
        max_depth: u32,
        crawl_type: CrawlType,
        /// Spec.md §6 `CredentialContext`: opaque, uninterpreted, echoed
        /// back for a downstream persistence layer to correlate against.
        credential_context: Option<String>,
        timestamp: DateTime<Utc>,
    },
    MethodDetected {
        url: String,
        method: FetchMethod,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    Progress {
        percentage: u32,
        pages_processed: usize,
        total_estimate: usize,
        current_url: String,
        status: String,
    },
    DepthChange {
        current_depth: u32,
        max_depth: u32,
        pages_at_this_depth: usize,
        timestamp: DateTime<Utc>,
    },
    LinkFound {
        url: String,
        source_url: String,
        depth: u32,
        link_count: usize,
    },
    Error {
        session_id: String,
        error_kind: ErrorKind,
        error_message: String,
        failed_url: String,
        fatal: bool,
        depth: Option<u32>,
        timestamp: DateTime<Utc>,
    },
    Complete {
        session_id: String,
        total_pages: usize,
        total_links: usize,
        duration_ms: u64,
        method: Option<FetchMethod>,
        max_depth_reached: Option<u32>,
        success_rate: Option<f64>,
        average_response_time_ms: Option<f64>,
        unique_domains: Option<usize>,
        credential_context: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

/// A non-throwing consumer of lifecycle events. `publish` must never panic
/// and must return promptly — delivery failures are the sink's problem to
/// log, never the caller's to propagate. If no sink is configured, callers
/// should use `NullSink` so events are dropped rather than special-cased.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: Event);
}

/// Drops every event. The default when a caller configures no sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: Event) {}
}

/// Collects every published event in order, for tests and for callers that
/// want to inspect a crawl's event history after the fact rather than
/// stream it live.
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<Event>>,
}

impl CollectingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl EventSink for CollectingSink {
    fn publish(&self, event: Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_sink_preserves_order() {
        let sink = CollectingSink::new();
        sink.publish(Event::Progress {
            percentage: 0,
            pages_processed: 0,
            total_estimate: 1,
            current_url: "http://a".into(),
            status: "start".into(),
        });
        sink.publish(Event::Progress {
            percentage: 100,
            pages_processed: 1,
            total_estimate: 1,
            current_url: "http://a".into(),
            status: "done".into(),
        });
        let events = sink.events();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn null_sink_never_panics() {
        let sink = NullSink;
        sink.publish(Event::LinkFound {
            url: "http://a".into(),
            source_url: "http://b".into(),
            depth: 0,
            link_count: 1,
        });
    }
}
