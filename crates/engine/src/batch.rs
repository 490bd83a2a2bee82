//! Batch single-page crawling: up to `opts.concurrency` Orchestrator calls
//! in parallel, with a 1-second pause between batches (spec.md §4.7 "batch
//! variant does not share `visited`"; §9 "concurrency scope" — recursive
//! stays sequential for deterministic ordering, batch is the one place
//! concurrency is allowed). Grounded on `src/crawl.rs`'s `tokio::spawn`
//! worker-pool pattern, simplified to a fixed-size chunked join since batch
//! has no shared frontier to coordinate across workers. Each URL gets its
//! own independent `crawl:start`/`crawl:complete` (crawlType:single) pair,
//! since batch shares no session across URLs.

use std::sync::Arc;
use std::time::Duration;

use hybridcrawl_core::{CancelToken, EventSink, Options, PageResult};
use hybridcrawl_fetch_dynamic::DynamicFetcher;
use hybridcrawl_fetch_static::StaticFetcher;

use crate::orchestrator::crawl_one_session;

/// `CrawlBatch(urls[], opts, sink, cancel) -> PageResult[]`.
pub async fn crawl_batch(
    static_fetcher: &StaticFetcher,
    dynamic_fetcher: &DynamicFetcher,
    urls: &[String],
    opts: &Options,
    sink: Arc<dyn EventSink>,
    cancel: CancelToken,
) -> Vec<PageResult> {
    let chunk_size = opts.concurrency.max(1);
    let mut results = Vec::with_capacity(urls.len());
    let chunks: Vec<&[String]> = urls.chunks(chunk_size).collect();
    let last = chunks.len().saturating_sub(1);

    for (i, chunk) in chunks.into_iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }

        let futures = chunk.iter().map(|url| {
            let sink = sink.clone();
            let cancel = cancel.clone();
            async move {
                crawl_one_session(static_fetcher, dynamic_fetcher, url, opts, &sink, &cancel).await
            }
        });
        results.extend(futures::future::join_all(futures).await);

        if i != last && !cancel.is_cancelled() {
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    results
}
