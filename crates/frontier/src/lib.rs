//! Per-session traversal bookkeeping for the recursive scheduler: the
//! visited set, depth tracking, domain scoping, and the rate-limit floor
//! with its 429 backoff multiplier. Grounded on
//! `darkscraper-frontier::CrawlFrontier`'s normalization/dedup helpers,
//! de-concurrency-ified per spec.md §5 ("session state is touched by a
//! single worker — no locking required"): a plain `HashSet`/`Vec` replaces
//! the teacher's `DashMap`-backed, cross-network priority queue, since a
//! recursive crawl session is sequential depth-first traversal, not a
//! scheduler shared by concurrent workers.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use hybridcrawl_core::normalize_key;
use url::Url;

/// How many invocations the doubled rate-limit delay stays in effect for
/// after a `RATE_LIMITED` response, per spec.md §4.7.
const RATE_LIMIT_BACKOFF_ROUNDS: u32 = 5;

/// Tracks which normalized URL keys have already been visited in one
/// recursive crawl session, plus the current depth-tracking and
/// rate-limit state. Owned exclusively by the session that created it.
pub struct Frontier {
    visited: HashSet<String>,
    last_emitted_depth: Option<u32>,
    max_depth_reached: u32,
    base_delay_ms: u64,
    backoff_rounds_remaining: u32,
    last_invocation: Option<Instant>,
}

impl Frontier {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            visited: HashSet::new(),
            last_emitted_depth: None,
            max_depth_reached: 0,
            base_delay_ms: delay_ms,
            backoff_rounds_remaining: 0,
            last_invocation: None,
        }
    }

    /// `true` if `key` has not yet been recorded as visited.
    pub fn is_new(&self, key: &str) -> bool {
        !self.visited.contains(key)
    }

    /// Record `key` as visited and bump `max_depth_reached` if `depth`
    /// exceeds it.
    pub fn mark_visited(&mut self, key: &str, depth: u32) {
        self.visited.insert(key.to_string());
        if depth > self.max_depth_reached {
            self.max_depth_reached = depth;
        }
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn max_depth_reached(&self) -> u32 {
        self.max_depth_reached
    }

    /// `true` the first time a given depth is seen, so the caller knows to
    /// publish `crawl:depth-change` before this URL's `crawl:progress`
    /// (spec.md §5's ordering guarantee).
    pub fn depth_changed(&mut self, depth: u32) -> bool {
        let changed = self.last_emitted_depth != Some(depth);
        self.last_emitted_depth = Some(depth);
        changed
    }

    /// Whether `candidate` is eligible to be queued as a child: not yet
    /// visited, and (if `same_domain_only`) sharing `seed_host`.
    pub fn accepts_child(&self, candidate: &Url, same_domain_only: bool, seed_host: &str) -> bool {
        if same_domain_only {
            let host = candidate.host_str().unwrap_or("").to_lowercase();
            if host != seed_host.to_lowercase() {
                return false;
            }
        }
        self.is_new(&normalize_key(candidate))
    }

    /// Called on a `RATE_LIMITED` response: doubles the delay floor for the
    /// next `RATE_LIMIT_BACKOFF_ROUNDS` invocations, then it reverts.
    pub fn trigger_rate_limit_backoff(&mut self) {
        self.backoff_rounds_remaining = RATE_LIMIT_BACKOFF_ROUNDS;
    }

    /// The delay floor that applies to the *next* `crawlOne` invocation,
    /// consuming one backoff round if one is active.
    fn current_delay(&mut self) -> Duration {
        if self.backoff_rounds_remaining > 0 {
            self.backoff_rounds_remaining -= 1;
            Duration::from_millis(self.base_delay_ms * 2)
        } else {
            Duration::from_millis(self.base_delay_ms)
        }
    }

    /// Sleep until at least `delayMs` (or its doubled backoff value) has
    /// elapsed since the previous invocation. A no-op before the first
    /// invocation. Spec.md §8's rate-floor invariant: for any two
    /// consecutive `crawlOne` calls at `t1 < t2`, `t2 - t1 >= delayMs`.
    pub async fn wait_for_next_slot(&mut self) {
        let delay = self.current_delay();
        if let Some(last) = self.last_invocation {
            let elapsed = last.elapsed();
            if elapsed < delay {
                tokio::time::sleep(delay - elapsed).await;
            }
        }
        self.last_invocation = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_rejects_revisits() {
        let mut f = Frontier::new(0);
        f.mark_visited("https://a.test/", 0);
        assert!(!f.is_new("https://a.test/"));
        assert!(f.is_new("https://a.test/other"));
    }

    #[test]
    fn depth_changed_only_fires_once_per_depth() {
        let mut f = Frontier::new(0);
        assert!(f.depth_changed(0));
        assert!(!f.depth_changed(0));
        assert!(f.depth_changed(1));
        assert!(!f.depth_changed(1));
    }

    #[test]
    fn max_depth_reached_tracks_highest_seen() {
        let mut f = Frontier::new(0);
        f.mark_visited("a", 0);
        f.mark_visited("b", 2);
        f.mark_visited("c", 1);
        assert_eq!(f.max_depth_reached(), 2);
    }

    #[test]
    fn accepts_child_respects_domain_scope() {
        let f = Frontier::new(0);
        let same = Url::parse("https://site.test/page").unwrap();
        let other = Url::parse("https://external.test/page").unwrap();
        assert!(f.accepts_child(&same, true, "site.test"));
        assert!(!f.accepts_child(&other, true, "site.test"));
        assert!(f.accepts_child(&other, false, "site.test"));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_backoff_doubles_delay_for_five_rounds() {
        let mut f = Frontier::new(100);
        f.wait_for_next_slot().await;
        f.trigger_rate_limit_backoff();

        let start = tokio::time::Instant::now();
        f.wait_for_next_slot().await;
        assert_eq!(start.elapsed(), Duration::from_millis(200));

        for _ in 0..3 {
            f.wait_for_next_slot().await;
        }

        let start = tokio::time::Instant::now();
        f.wait_for_next_slot().await;
        assert_eq!(start.elapsed(), Duration::from_millis(100));
    }
}
