//! The hybrid crawl engine: wires the fetchers, detector, and frontier
//! together behind the three public operations spec.md §6 names
//! (`CrawlOne`, `CrawlBatch`, `CrawlRecursive`). No direct teacher analog
//! for this crate as a whole — see DESIGN.md for the per-module grounding
//! of `orchestrator`, `scheduler`, and `batch`.

pub mod batch;
pub mod orchestrator;
pub mod scheduler;

use std::sync::Arc;

use hybridcrawl_core::{CancelToken, CrawlSession, EventSink, Options, PageResult};
use hybridcrawl_fetch_dynamic::DynamicFetcher;
use hybridcrawl_fetch_static::StaticFetcher;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to construct static fetcher: {0}")]
    StaticFetcherInit(#[from] reqwest::Error),
}

/// Owns the long-lived fetcher clients (the static fetcher's `reqwest`
/// clients in particular are built once and reused, per spec.md §4.3) and
/// exposes the three public crawl operations as methods.
pub struct Engine {
    static_fetcher: StaticFetcher,
    dynamic_fetcher: DynamicFetcher,
}

impl Engine {
    pub fn new(opts: &Options) -> Result<Self, EngineError> {
        let fetch_config = opts.fetch_config();
        Ok(Self {
            static_fetcher: StaticFetcher::new(&fetch_config)?,
            dynamic_fetcher: DynamicFetcher::new(),
        })
    }

    /// `CrawlOne(url, opts, sink, cancel) -> PageResult`.
    pub async fn crawl_one(
        &self,
        url: &str,
        opts: &Options,
        sink: Arc<dyn EventSink>,
        cancel: CancelToken,
    ) -> PageResult {
        orchestrator::crawl_one_session(
            &self.static_fetcher,
            &self.dynamic_fetcher,
            url,
            opts,
            &sink,
            &cancel,
        )
        .await
    }

    /// `CrawlBatch(urls[], opts, sink, cancel) -> PageResult[]`.
    pub async fn crawl_batch(
        &self,
        urls: &[String],
        opts: &Options,
        sink: Arc<dyn EventSink>,
        cancel: CancelToken,
    ) -> Vec<PageResult> {
        batch::crawl_batch(&self.static_fetcher, &self.dynamic_fetcher, urls, opts, sink, cancel).await
    }

    /// `CrawlRecursive(seedURL, opts, sink, cancel) -> CrawlSession`.
    pub async fn crawl_recursive(
        &self,
        seed_url: &str,
        opts: &Options,
        sink: Arc<dyn EventSink>,
        cancel: CancelToken,
    ) -> CrawlSession {
        scheduler::crawl_recursive(
            &self.static_fetcher,
            &self.dynamic_fetcher,
            seed_url,
            opts,
            sink,
            cancel,
        )
        .await
    }
}
