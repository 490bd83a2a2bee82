//! Shared data model (spec.md §3): `FetchOutcome`, `PageResult`,
//! `DetectionVerdict`, `CrawlSession`, and the options every public
//! operation accepts. Grounded on `darkscraper-core::types`
//! (`FetchConfig`, `FetchResponse`, `PageData`, `ExtractedLink`,
//! `PageMetadata`), generalized from dark-web network fields to the
//! spec's static/dynamic fetch fields.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMethod {
    Static,
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlType {
    Single,
    Recursive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForceMethod {
    Static,
    Dynamic,
    Auto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsInfo {
    pub protocol: String,
    pub min_version: String,
    pub cert_valid: bool,
}

/// Fetch-side configuration passed to both the static and dynamic
/// fetchers. Grounded on `darkscraper-core::types::FetchConfig`.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: String,
    pub accept_language: String,
    pub max_retries: u32,
    pub block_resources: bool,
    pub wait_idle_connections: usize,
    pub wait_idle_ms: u64,
    pub viewport: (u32, u32),
    pub auto_scroll: bool,
    pub max_scrolls: u32,
    pub screenshot: bool,
    pub screenshot_dir: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_redirects: 5,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string(),
            accept_language: "en".to_string(),
            max_retries: 2,
            block_resources: true,
            wait_idle_connections: 2,
            wait_idle_ms: 500,
            viewport: (1920, 1080),
            auto_scroll: false,
            max_scrolls: 10,
            screenshot: false,
            screenshot_dir: None,
        }
    }
}

/// Result of one fetch attempt: either a response we can work with, or a
/// classified failure. Spec.md §3 `FetchOutcome`.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Success {
        final_url: Url,
        status: u16,
        body: Vec<u8>,
        content_type: Option<String>,
        response_size: usize,
        tls_info: Option<TlsInfo>,
        duration: Duration,
        headers: HashMap<String, String>,
    },
    Failure {
        kind: ErrorKind,
        message: String,
        duration: Duration,
    },
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageMetadata {
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub author: Option<String>,
    pub og_image: Option<String>,
    pub twitter_card: Option<String>,
    pub favicon: Option<String>,
    pub language: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionMetrics {
    pub link_count: usize,
    pub script_count: usize,
    pub text_length: usize,
    pub script_to_content_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    React,
    Vue,
    Angular,
    Nextjs,
    Nuxt,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionVerdict {
    pub needs_dynamic: bool,
    pub confidence: f64,
    pub reason: String,
    pub framework: Framework,
    pub metrics: DetectionMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDiagnostics {
    pub duration_ms: u64,
    pub status_code: Option<u16>,
    pub response_size: usize,
    pub tls_info: Option<TlsInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageError {
    pub kind: ErrorKind,
    pub message: String,
}

// `ErrorKind` carries no serde derive of its own (it lives in `error.rs`
// next to the taxonomy it classifies); bridge it here so `PageResult` can
// still serialize for the CLI's NDJSON sink.
impl Serialize for ErrorKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&format!("{self:?}"))
    }
}

/// Semantic record produced per URL. Spec.md §3 `PageResult`.
#[derive(Debug, Clone, Serialize)]
pub struct PageResult {
    pub url: String,
    pub final_url: String,
    pub title: Option<String>,
    pub links: Vec<String>,
    pub metadata: PageMetadata,
    pub fetch_method: FetchMethod,
    pub diagnostics: PageDiagnostics,
    pub detection: Option<DetectionVerdict>,
    pub success: bool,
    pub error: Option<PageError>,
    /// Opaque caller-supplied identifier for the owning user (spec.md §6
    /// `CredentialContext`), echoed back uninterpreted for a downstream
    /// persistence layer to correlate against. `None` when the caller
    /// configured no credential context.
    pub credential_context: Option<String>,
}

/// One visited page inside a recursive session: a `PageResult` plus the
/// depth it was discovered at and when it was crawled.
#[derive(Debug, Clone, Serialize)]
pub struct SessionPageResult {
    pub depth: u32,
    pub crawled_at: DateTime<Utc>,
    #[serde(flatten)]
    pub page: PageResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrawlSession {
    pub session_id: String,
    pub seed_url: String,
    pub base_host: String,
    pub visited: Vec<String>,
    pub results: Vec<SessionPageResult>,
    pub max_depth_reached: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub limits: Limits,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Limits {
    pub max_depth: u32,
    pub max_pages: usize,
    pub child_links_per_page: usize,
    pub delay_ms: u64,
    pub same_domain_only: bool,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_pages: 50,
            child_links_per_page: 3,
            delay_ms: 1500,
            same_domain_only: true,
        }
    }
}

/// Every recognized option (spec.md §6), with the bracketed defaults.
#[derive(Debug, Clone)]
pub struct Options {
    pub force_method: ForceMethod,
    pub detection_threshold: f64,
    pub max_retries: u32,
    pub timeout_ms: u64,
    pub limits: Limits,
    pub block_resources: bool,
    pub auto_scroll: bool,
    pub screenshot: bool,
    pub screenshot_dir: Option<String>,
    pub concurrency: usize,
    pub credential_context: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            force_method: ForceMethod::Auto,
            detection_threshold: 0.5,
            max_retries: 2,
            timeout_ms: 30_000,
            limits: Limits::default(),
            block_resources: true,
            auto_scroll: false,
            screenshot: false,
            screenshot_dir: None,
            concurrency: 3,
            credential_context: None,
        }
    }
}

impl Options {
    /// Clamp user-supplied limits to the caps in spec.md §4.7.
    pub fn clamped(mut self) -> Self {
        self.limits.max_depth = self.limits.max_depth.min(5);
        self.limits.max_pages = self.limits.max_pages.min(100);
        self.limits.child_links_per_page = self.limits.child_links_per_page.min(10);
        self.limits.delay_ms = self.limits.delay_ms.clamp(500, 5000);
        self
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            timeout: Duration::from_millis(self.timeout_ms),
            max_retries: self.max_retries,
            block_resources: self.block_resources,
            auto_scroll: self.auto_scroll,
            screenshot: self.screenshot,
            screenshot_dir: self.screenshot_dir.clone(),
            ..FetchConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_enforces_caps() {
        let opts = Options {
            limits: Limits {
                max_depth: 99,
                max_pages: 99_999,
                child_links_per_page: 999,
                delay_ms: 1,
                same_domain_only: true,
            },
            ..Options::default()
        }
        .clamped();
        assert_eq!(opts.limits.max_depth, 5);
        assert_eq!(opts.limits.max_pages, 100);
        assert_eq!(opts.limits.child_links_per_page, 10);
        assert_eq!(opts.limits.delay_ms, 500);
    }

    #[test]
    fn defaults_match_spec() {
        let opts = Options::default();
        assert_eq!(opts.limits.max_depth, 3);
        assert_eq!(opts.limits.max_pages, 50);
        assert_eq!(opts.limits.child_links_per_page, 3);
        assert_eq!(opts.limits.delay_ms, 1500);
        assert!(opts.limits.same_domain_only);
        assert_eq!(opts.detection_threshold, 0.5);
        assert_eq!(opts.max_retries, 2);
        assert_eq!(opts.concurrency, 3);
    }
}
