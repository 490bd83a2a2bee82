//! TLS-strict HTTP fetcher with a targeted legacy-TLS fallback. Grounded
//! on `darkscraper-networks::tor::TorDriver` (client built once and reused,
//! fetch shape of status/headers/body/elapsed/final-URL) generalized from a
//! SOCKS-proxied onion fetcher to a direct dual-TLS-profile HTTP(S) client,
//! and on the `danger_accept_invalid_certs` pattern in
//! `other_examples/0ce50134_Rapheal7-My-Agent__src-tools-web.rs.rs`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use hybridcrawl_core::{classify_message, CancelToken, ErrorKind, FetchConfig, FetchOutcome, TlsInfo};
use tracing::debug;
use url::Url;

/// Two `reqwest::Client`s, built once at construction and reused for every
/// fetch: Strict only ever speaks TLS 1.2+ and verifies certificates;
/// Legacy is a deliberately weakened profile used solely as a one-shot
/// fallback when Strict fails with an SSL-family error.
pub struct StaticFetcher {
    strict: reqwest::Client,
    legacy: reqwest::Client,
}

impl StaticFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let strict = reqwest::Client::builder()
            .use_rustls_tls()
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(&config.user_agent)
            .build()?;

        let legacy = reqwest::Client::builder()
            .use_native_tls()
            .danger_accept_invalid_certs(true)
            .min_tls_version(reqwest::tls::Version::TLS_1_0)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { strict, legacy })
    }

    /// Fetch `url`, retrying Strict up to `config.max_retries` times with
    /// `1500 × attempt` ms backoff, and falling back to Legacy exactly once
    /// (consuming no further retries) the moment an SSL-family error is
    /// classified. A cancellation observed before any attempt or retry
    /// sleep short-circuits with an `Unknown`-kind failure.
    pub async fn fetch(&self, url: &Url, config: &FetchConfig, cancel: &CancelToken) -> FetchOutcome {
        let max_retries = config.max_retries.max(1);
        let mut attempt = 1u32;

        loop {
            if cancel.is_cancelled() {
                return cancelled();
            }

            let start = Instant::now();
            match self.attempt(&self.strict, url, config, "strict").await {
                Ok(outcome) => return outcome,
                Err((kind, message)) => {
                    if kind.is_ssl_family() {
                        debug!(%url, ?kind, "strict TLS failed, falling back to legacy TLS once");
                        return match self.attempt(&self.legacy, url, config, "legacy").await {
                            Ok(outcome) => outcome,
                            Err((kind, message)) => FetchOutcome::Failure {
                                kind,
                                message,
                                duration: start.elapsed(),
                            },
                        };
                    }

                    if kind.retryable() && attempt < max_retries {
                        if cancel.is_cancelled() {
                            return cancelled();
                        }
                        let delay = Duration::from_millis(1500 * attempt as u64);
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    return FetchOutcome::Failure {
                        kind,
                        message,
                        duration: start.elapsed(),
                    };
                }
            }
        }
    }

    async fn attempt(
        &self,
        client: &reqwest::Client,
        url: &Url,
        config: &FetchConfig,
        profile: &str,
    ) -> Result<FetchOutcome, (ErrorKind, String)> {
        let start = Instant::now();
        let response = client
            .get(url.clone())
            .header(reqwest::header::ACCEPT_LANGUAGE, &config.accept_language)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        let status = response.status();
        let final_url = Url::parse(response.url().as_str()).unwrap_or_else(|_| url.clone());

        let mut headers = HashMap::new();
        for (k, v) in response.headers() {
            if let Ok(val) = v.to_str() {
                headers.insert(k.as_str().to_string(), val.to_string());
            }
        }
        let content_type = headers.get("content-type").cloned();

        // Status >= 400 is reported as a classified failure, not a Success
        // carrying an error status.
        if status.as_u16() >= 400 {
            let message = format!("HTTP {status}");
            let kind = classify_message(&message, Some(status.as_u16()));
            return Err((kind, message));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        Ok(FetchOutcome::Success {
            final_url,
            status: status.as_u16(),
            response_size: body.len(),
            body: body.to_vec(),
            content_type,
            tls_info: Some(tls_info_for(profile)),
            duration: start.elapsed(),
            headers,
        })
    }
}

fn cancelled() -> FetchOutcome {
    FetchOutcome::Failure {
        kind: ErrorKind::Unknown,
        message: "cancelled".to_string(),
        duration: Duration::ZERO,
    }
}

fn tls_info_for(profile: &str) -> TlsInfo {
    match profile {
        "strict" => TlsInfo {
            protocol: "TLS".to_string(),
            min_version: "1.2".to_string(),
            cert_valid: true,
        },
        _ => TlsInfo {
            protocol: "TLS".to_string(),
            min_version: "1.0".to_string(),
            cert_valid: false,
        },
    }
}

/// Classify a `reqwest::Error` by walking its source chain: TLS-backend
/// error strings (rustls/native-tls) surface there, not in `reqwest`'s own
/// `Display`. Grounded on the `other_examples` web-tool's practice of
/// building a classifier directly off a configured client's errors.
fn classify_transport_error(e: &reqwest::Error) -> (ErrorKind, String) {
    let message = describe_error(e);

    if e.is_timeout() {
        return (ErrorKind::Timeout, message);
    }
    if e.is_connect() {
        let kind = classify_message(&message, None);
        let kind = if kind == ErrorKind::Unknown {
            ErrorKind::ConnectionRefused
        } else {
            kind
        };
        return (kind, message);
    }

    let kind = classify_message(&message, e.status().map(|s| s.as_u16()));
    (kind, message)
}

fn describe_error(e: &reqwest::Error) -> String {
    let mut parts = vec![e.to_string()];
    let mut source = std::error::Error::source(e);
    while let Some(s) = source {
        parts.push(s.to_string());
        source = s.source();
    }
    parts.join(": ")
}
