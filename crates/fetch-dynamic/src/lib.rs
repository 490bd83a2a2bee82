//! Headless-browser fetcher for JavaScript-rendered pages. Grounded on
//! `darkscraper-registration::browser::HeadlessBrowser`: one fresh browser
//! (and tab) per call, the same `--no-sandbox --disable-dev-shm-usage`
//! launch args, and the same content-settle poll loop as
//! `navigate_and_wait`/`has_waiting_screen`, generalized from a
//! registration-form waiting heuristic to a general dynamic-render wait.
//! Extraction of title/links/metadata is deliberately not duplicated here
//! in JS: the rendered DOM snapshot (`tab.get_content()`) is handed to
//! `hybridcrawl-parser`, the same extractor the static fetcher's output
//! goes through, so there is exactly one place that implements metadata
//! and link extraction (see DESIGN.md).

use std::ffi::OsString;
use std::sync::Arc;
use std::time::{Duration, Instant};

use headless_chrome::browser::tab::RequestPausedDecision;
use headless_chrome::protocol::cdp::Fetch::events::RequestPausedEvent;
use headless_chrome::protocol::cdp::Network::ErrorReason;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptionsBuilder, Tab};
use hybridcrawl_core::{ErrorKind, FetchConfig, FetchOutcome, TlsInfo};
use tracing::{debug, warn};
use url::Url;

/// Resource types dropped when `block_resources` is set, per spec.md
/// §4.4. CDP's `ResourceType` strings, matched as returned on
/// `RequestPausedEvent`.
const BLOCKED_RESOURCE_TYPES: &[&str] = &["Image", "Stylesheet", "Font", "Media", "WebSocket"];

/// Known analytics hosts blocked alongside resource-type filtering.
const ANALYTICS_HOSTS: &[&str] = &[
    "google-analytics.com",
    "googletagmanager.com",
    "doubleclick.net",
    "facebook.net",
    "hotjar.com",
    "segment.io",
    "mixpanel.com",
];

pub struct DynamicFetcher;

impl DynamicFetcher {
    pub fn new() -> Self {
        Self
    }

    /// Render `url` in a fresh headless browser and return the raw HTML
    /// body. The browser (and its one tab) is dropped at the end of this
    /// call on every exit path — success, render failure, or an early
    /// return — since `Browser` closes its child process in `Drop`.
    pub async fn fetch(&self, url: &Url, config: &FetchConfig) -> FetchOutcome {
        let start = Instant::now();

        let browser = match self.launch(config) {
            Ok(browser) => browser,
            Err(message) => {
                return FetchOutcome::Failure {
                    kind: ErrorKind::Unknown,
                    message,
                    duration: start.elapsed(),
                }
            }
        };

        match self.render(&browser, url, config).await {
            Ok((body, status)) => FetchOutcome::Success {
                final_url: url.clone(),
                status,
                response_size: body.len(),
                body,
                content_type: Some("text/html".to_string()),
                tls_info: Some(TlsInfo {
                    protocol: "TLS".to_string(),
                    min_version: "1.2".to_string(),
                    cert_valid: true,
                }),
                duration: start.elapsed(),
                headers: Default::default(),
            },
            Err((kind, message)) => FetchOutcome::Failure {
                kind,
                message,
                duration: start.elapsed(),
            },
        }
    }

    fn launch(&self, config: &FetchConfig) -> Result<Browser, String> {
        let extra_args: Vec<OsString> = vec![
            OsString::from("--no-sandbox"),
            OsString::from("--disable-dev-shm-usage"),
            OsString::from("--disable-gpu"),
        ];

        let mut builder = LaunchOptionsBuilder::default();
        builder
            .headless(true)
            .window_size(Some(config.viewport))
            .idle_browser_timeout(config.timeout)
            .args(extra_args.iter().map(|a| a.as_ref()).collect());

        if let Ok(chrome_path) = std::env::var("CHROME_PATH") {
            builder.path(Some(std::path::PathBuf::from(chrome_path)));
        }

        let launch_options = builder.build().map_err(|e| e.to_string())?;
        Browser::new(launch_options).map_err(|e| e.to_string())
    }

    async fn render(
        &self,
        browser: &Browser,
        url: &Url,
        config: &FetchConfig,
    ) -> Result<(Vec<u8>, u16), (ErrorKind, String)> {
        let tab = browser
            .new_tab()
            .map_err(|e| (ErrorKind::Unknown, e.to_string()))?;

        if config.block_resources {
            if let Err(e) = enable_resource_blocking(&tab) {
                warn!(%url, error = %e, "failed to enable resource blocking, continuing unblocked");
            }
        }

        debug!(%url, "navigating");
        tab.navigate_to(url.as_str())
            .map_err(|e| (ErrorKind::Unknown, e.to_string()))?;
        tab.wait_until_navigated()
            .map_err(|e| (ErrorKind::Timeout, e.to_string()))?;

        wait_for_content_settle(&tab, config).await?;

        if config.auto_scroll {
            auto_scroll(&tab, config).await;
        }

        if config.screenshot {
            if let Some(dir) = &config.screenshot_dir {
                if let Err(e) = capture_screenshot(&tab, dir, url) {
                    warn!(%url, error = %e, "screenshot capture failed, continuing");
                }
            }
        }

        let body = tab
            .get_content()
            .map_err(|e| (ErrorKind::Unknown, e.to_string()))?;

        Ok((body.into_bytes(), 200))
    }
}

impl Default for DynamicFetcher {
    fn default() -> Self {
        Self::new()
    }
}

fn enable_resource_blocking(tab: &Arc<Tab>) -> Result<(), String> {
    tab.enable_request_interception(Arc::new(
        move |_transport, _session_id, event: RequestPausedEvent| {
            let resource_type = event.params.resource_type.to_string();
            let request_url = event.params.request.url.clone();
            let blocked_type = BLOCKED_RESOURCE_TYPES
                .iter()
                .any(|t| resource_type.eq_ignore_ascii_case(t));
            let blocked_host = ANALYTICS_HOSTS
                .iter()
                .any(|host| request_url.contains(host));

            if blocked_type || blocked_host {
                RequestPausedDecision::Fail(ErrorReason::BlockedByClient)
            } else {
                RequestPausedDecision::Continue(None)
            }
        },
    ))
    .map_err(|e| e.to_string())
}

/// Poll the rendered DOM until it no longer looks like a loading/
/// interstitial screen, up to `config.timeout`. Grounded on
/// `HeadlessBrowser::navigate_and_wait`'s identical loop; `wait_idle_ms`
/// here is the poll cadence rather than a literal CDP network-idle signal,
/// since `headless_chrome`'s public API exposes DOM content, not raw
/// in-flight request counts.
async fn wait_for_content_settle(
    tab: &Arc<Tab>,
    config: &FetchConfig,
) -> Result<(), (ErrorKind, String)> {
    let deadline = Instant::now() + config.timeout;
    loop {
        if Instant::now() > deadline {
            return Err((ErrorKind::Timeout, "timed out waiting for page to settle".to_string()));
        }

        let html = tab
            .get_content()
            .map_err(|e| (ErrorKind::Unknown, e.to_string()))?;
        if content_looks_settled(&html) {
            break;
        }

        tokio::time::sleep(Duration::from_millis(config.wait_idle_ms)).await;
    }

    // Give any trailing JS a moment to finish after the heuristic passes.
    tokio::time::sleep(Duration::from_millis(config.wait_idle_ms)).await;
    Ok(())
}

fn content_looks_settled(html: &str) -> bool {
    let lower = html.to_lowercase();
    let is_loading = lower.contains("please wait")
        || lower.contains("checking your browser")
        || lower.contains("just a moment")
        || lower.contains("ddos protection")
        || lower.contains("verifying you are human");
    let has_content = html.len() > 500 || lower.contains("<body");
    !is_loading && has_content
}

async fn auto_scroll(tab: &Arc<Tab>, config: &FetchConfig) {
    for _ in 0..config.max_scrolls {
        let height_covered = tab
            .evaluate(
                "window.scrollY + window.innerHeight >= document.body.scrollHeight",
                false,
            )
            .ok()
            .and_then(|r| r.value)
            .and_then(|v| v.as_bool())
            .unwrap_or(true);
        if height_covered {
            break;
        }
        let _ = tab.evaluate("window.scrollBy(0, 100);", false);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    tokio::time::sleep(Duration::from_secs(1)).await;
}

fn capture_screenshot(tab: &Arc<Tab>, dir: &str, _url: &Url) -> Result<(), String> {
    let data = tab
        .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
        .map_err(|e| e.to_string())?;
    let unix_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let path = std::path::Path::new(dir).join(format!("screenshot-{unix_ms}.png"));
    std::fs::write(path, data).map_err(|e| e.to_string())
}
