//! Recursive Scheduler (spec.md §4.7): bounded depth-first traversal with
//! dedup, depth/page ceilings, domain scoping, and a politeness delay with
//! 429 backoff. Grounded on `darkscraper-frontier::CrawlFrontier`'s
//! normalization/bookkeeping and `src/crawl.rs`'s per-URL shape (fetch →
//! parse → discover links → enqueue), replaced here with sequential
//! recursion per spec.md §4.7/§9 — the teacher's worker-pool/DB-pipeline
//! concurrency has no counterpart in a single, deterministic, depth-first
//! session.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use hybridcrawl_core::{
    normalize_key, validate_absolute, CancelToken, CrawlSession, CrawlType, ErrorKind, Event,
    EventSink, Options, PageResult, SessionPageResult,
};
use hybridcrawl_fetch_dynamic::DynamicFetcher;
use hybridcrawl_fetch_static::StaticFetcher;
use hybridcrawl_frontier::Frontier;
use tracing::warn;
use url::Url;

use crate::orchestrator::crawl_one;

struct RecursionCtx<'a> {
    static_fetcher: &'a StaticFetcher,
    dynamic_fetcher: &'a DynamicFetcher,
    opts: &'a Options,
    sink: &'a Arc<dyn EventSink>,
    cancel: &'a CancelToken,
    session_id: String,
    seed_host: String,
}

/// `CrawlRecursive(seedURL, opts, sink, cancel) -> CrawlSession`.
pub async fn crawl_recursive(
    static_fetcher: &StaticFetcher,
    dynamic_fetcher: &DynamicFetcher,
    seed_url: &str,
    opts: &Options,
    sink: Arc<dyn EventSink>,
    cancel: CancelToken,
) -> CrawlSession {
    let session_id = uuid::Uuid::new_v4().to_string();
    let started_at = Utc::now();
    let wall_start = Instant::now();

    sink.publish(Event::CrawlStart {
        session_id: session_id.clone(),
        seed_url: seed_url.to_string(),
        max_depth: opts.limits.max_depth,
        crawl_type: CrawlType::Recursive,
        credential_context: opts.credential_context.clone(),
        timestamp: started_at,
    });

    let seed = match validate_absolute(seed_url) {
        Ok(url) => url,
        Err(_) => {
            sink.publish(Event::Error {
                session_id: session_id.clone(),
                error_kind: ErrorKind::InvalidUrl,
                error_message: format!("invalid seed URL: {seed_url}"),
                failed_url: seed_url.to_string(),
                fatal: true,
                depth: None,
                timestamp: Utc::now(),
            });
            let session = empty_session(session_id, seed_url, "", opts, started_at);
            publish_complete(&sink, &session, wall_start, opts.credential_context.clone());
            return session;
        }
    };
    let seed_host = seed.host_str().unwrap_or("").to_lowercase();

    let mut frontier = Frontier::new(opts.limits.delay_ms);
    let mut results: Vec<SessionPageResult> = Vec::new();
    let mut cancelled = false;

    let ctx = RecursionCtx {
        static_fetcher,
        dynamic_fetcher,
        opts,
        sink: &sink,
        cancel: &cancel,
        session_id: session_id.clone(),
        seed_host: seed_host.clone(),
    };

    visit(&ctx, seed, 0, &mut frontier, &mut results, &mut cancelled).await;

    if cancelled {
        sink.publish(Event::Error {
            session_id: session_id.clone(),
            error_kind: ErrorKind::Unknown,
            error_message: "crawl cancelled".to_string(),
            failed_url: seed_url.to_string(),
            fatal: true,
            depth: None,
            timestamp: Utc::now(),
        });
    }

    let session = CrawlSession {
        session_id,
        seed_url: seed_url.to_string(),
        base_host: seed_host,
        visited: results.iter().map(|r| normalize_key_str(&r.page.url)).collect(),
        results,
        max_depth_reached: frontier.max_depth_reached(),
        started_at,
        finished_at: Some(Utc::now()),
        limits: opts.limits,
        cancelled,
    };

    publish_complete(&sink, &session, wall_start, opts.credential_context.clone());
    session
}

fn normalize_key_str(url: &str) -> String {
    Url::parse(url)
        .map(|u| normalize_key(&u))
        .unwrap_or_else(|_| url.to_string())
}

/// Depth-first visit of one URL and (recursively) its selected children.
/// Boxed because async fns can't recurse directly.
fn visit<'a>(
    ctx: &'a RecursionCtx<'a>,
    url: Url,
    depth: u32,
    frontier: &'a mut Frontier,
    results: &'a mut Vec<SessionPageResult>,
    cancelled: &'a mut bool,
) -> Pin<Box<dyn Future<Output = ()> + 'a>> {
    Box::pin(async move {
        if ctx.cancel.is_cancelled() {
            *cancelled = true;
            return;
        }
        if depth > ctx.opts.limits.max_depth {
            return;
        }
        if frontier.visited_count() >= ctx.opts.limits.max_pages {
            return;
        }
        let key = normalize_key(&url);
        if !frontier.is_new(&key) {
            return;
        }
        if ctx.opts.limits.same_domain_only {
            let host = url.host_str().unwrap_or("").to_lowercase();
            if host != ctx.seed_host {
                return;
            }
        }

        frontier.mark_visited(&key, depth);

        if frontier.depth_changed(depth) {
            ctx.sink.publish(Event::DepthChange {
                current_depth: depth,
                max_depth: ctx.opts.limits.max_depth,
                pages_at_this_depth: 1,
                timestamp: Utc::now(),
            });
        }

        let pages_processed = frontier.visited_count();
        let percentage = ((100 * pages_processed) / ctx.opts.limits.max_pages.max(1)).min(100) as u32;
        ctx.sink.publish(Event::Progress {
            percentage,
            pages_processed,
            total_estimate: ctx.opts.limits.max_pages,
            current_url: url.to_string(),
            status: "crawling".to_string(),
        });

        // No-op before the very first invocation (seed); records this
        // invocation's timestamp either way so the floor also covers the
        // seed -> first-child pair, not just child -> child pairs.
        frontier.wait_for_next_slot().await;
        if ctx.cancel.is_cancelled() {
            *cancelled = true;
            return;
        }

        let page: PageResult = crawl_one(
            ctx.static_fetcher,
            ctx.dynamic_fetcher,
            url.as_str(),
            ctx.opts,
            ctx.sink,
            ctx.cancel,
        )
        .await;

        if !page.success {
            if let Some(err) = &page.error {
                if err.kind == ErrorKind::RateLimited {
                    frontier.trigger_rate_limit_backoff();
                }
                ctx.sink.publish(Event::Error {
                    session_id: ctx.session_id.clone(),
                    error_kind: err.kind,
                    error_message: err.message.clone(),
                    failed_url: url.to_string(),
                    fatal: false,
                    depth: Some(depth),
                    timestamp: Utc::now(),
                });
            }
        }

        let success = page.success;
        let links = page.links.clone();
        results.push(SessionPageResult {
            depth,
            crawled_at: Utc::now(),
            page,
        });

        if !success || depth >= ctx.opts.limits.max_depth {
            return;
        }

        let mut children = Vec::new();
        let mut link_index = 0usize;
        for link in &links {
            let Ok(candidate) = Url::parse(link) else {
                continue;
            };
            link_index += 1;
            if link_index % 5 == 0 {
                ctx.sink.publish(Event::LinkFound {
                    url: candidate.to_string(),
                    source_url: url.to_string(),
                    depth,
                    link_count: link_index,
                });
            }
            if children.len() < ctx.opts.limits.child_links_per_page
                && frontier.accepts_child(&candidate, ctx.opts.limits.same_domain_only, &ctx.seed_host)
            {
                children.push(candidate);
            }
        }

        for child in children {
            if ctx.cancel.is_cancelled() {
                *cancelled = true;
                return;
            }
            if frontier.visited_count() >= ctx.opts.limits.max_pages {
                return;
            }
            visit(ctx, child, depth + 1, frontier, results, cancelled).await;
            if *cancelled {
                return;
            }
        }
    })
}

fn empty_session(
    session_id: String,
    seed_url: &str,
    base_host: &str,
    opts: &Options,
    started_at: chrono::DateTime<Utc>,
) -> CrawlSession {
    CrawlSession {
        session_id,
        seed_url: seed_url.to_string(),
        base_host: base_host.to_string(),
        visited: Vec::new(),
        results: Vec::new(),
        max_depth_reached: 0,
        started_at,
        finished_at: Some(Utc::now()),
        limits: opts.limits,
        cancelled: false,
    }
}

fn publish_complete(
    sink: &Arc<dyn EventSink>,
    session: &CrawlSession,
    wall_start: Instant,
    credential_context: Option<String>,
) {
    let total_pages = session.results.len();
    let total_links: usize = session.results.iter().map(|r| r.page.links.len()).sum();
    let successes = session.results.iter().filter(|r| r.page.success).count();
    let success_rate = if total_pages > 0 {
        Some(successes as f64 / total_pages as f64)
    } else {
        None
    };
    let average_response_time_ms = if total_pages > 0 {
        let sum: u64 = session.results.iter().map(|r| r.page.diagnostics.duration_ms).sum();
        Some(sum as f64 / total_pages as f64)
    } else {
        None
    };
    let unique_domains = session
        .results
        .iter()
        .filter_map(|r| Url::parse(&r.page.url).ok())
        .filter_map(|u| u.host_str().map(str::to_lowercase))
        .collect::<HashSet<_>>()
        .len();

    if session.cancelled {
        warn!(session_id = %session.session_id, pages = total_pages, "recursive crawl ended by cancellation");
    }

    sink.publish(Event::Complete {
        session_id: session.session_id.clone(),
        total_pages,
        total_links,
        duration_ms: wall_start.elapsed().as_millis() as u64,
        method: None,
        max_depth_reached: Some(session.max_depth_reached),
        success_rate,
        average_response_time_ms,
        unique_domains: Some(unique_domains),
        credential_context,
        timestamp: Utc::now(),
    });
}
