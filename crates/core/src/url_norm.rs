//! URL normalization and validation: the single source of truth used by the
//! parser, detector, frontier, and engine crates so two of them never
//! disagree about what counts as the same URL.

use tracing::debug;
use url::Url;

/// Schemes/substrings that are never safe to fetch or recurse into. Checked
/// case-insensitively against the raw string, not just the parsed scheme,
/// since some of these can be smuggled past naive scheme checks (e.g. inside
/// a percent-encoded or whitespace-padded `href`).
const BANNED_SUBSTRINGS: &[&str] = &["javascript:", "data:", "file:", "vbscript:", "about:"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidUrl(pub String);

impl std::fmt::Display for InvalidUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid URL: {}", self.0)
    }
}

impl std::error::Error for InvalidUrl {}

/// Parse `s` as an absolute URL, rejecting anything not http(s) and any
/// occurrence of a banned scheme substring anywhere in the string.
pub fn validate_absolute(s: &str) -> Result<Url, InvalidUrl> {
    let lower = s.to_lowercase();
    if BANNED_SUBSTRINGS.iter().any(|bad| lower.contains(bad)) {
        debug!(url = %s, "rejected URL containing a banned scheme substring");
        return Err(InvalidUrl(s.to_string()));
    }

    let url = Url::parse(s).map_err(|_| InvalidUrl(s.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => {
            debug!(url = %s, scheme, "rejected URL with unsupported scheme");
            Err(InvalidUrl(s.to_string()))
        }
    }
}

/// Resolve `href` relative to `base`, then validate the result.
pub fn resolve_relative(href: &str, base: &Url) -> Result<Url, InvalidUrl> {
    let lower = href.to_lowercase();
    if BANNED_SUBSTRINGS.iter().any(|bad| lower.contains(bad)) {
        return Err(InvalidUrl(href.to_string()));
    }
    let joined = base.join(href).map_err(|_| InvalidUrl(href.to_string()))?;
    validate_absolute(joined.as_str())
}

/// Reduce a URL to its deduplication key: lowercase host, preserve path
/// case, strip a trailing `/` unless the path is exactly `/`, drop the
/// fragment and query. Query is kept on the original `Url` used for
/// fetching but never appears in the key.
pub fn normalize_key(url: &Url) -> String {
    let scheme = url.scheme();
    let host = url.host_str().unwrap_or("").to_lowercase();
    let port_suffix = match url.port() {
        Some(p) if !is_default_port(scheme, p) => format!(":{p}"),
        _ => String::new(),
    };
    let path = url.path();
    let trimmed_path = if path.len() > 1 && path.ends_with('/') {
        &path[..path.len() - 1]
    } else {
        path
    };
    format!("{scheme}://{host}{port_suffix}{trimmed_path}")
}

fn is_default_port(scheme: &str, port: u16) -> bool {
    matches!((scheme, port), ("http", 80) | ("https", 443))
}

/// Resolve, validate, and deduplicate a batch of candidate link strings
/// against a base URL. Failures (invalid scheme, malicious scheme,
/// unparsable) are silently dropped, per spec.md §4.1. The first absolute
/// form seen for a given normalized key is preserved; later duplicates are
/// dropped.
pub fn sanitize_links(links: &[String], base: &Url) -> Vec<Url> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for href in links {
        let Ok(resolved) = resolve_relative(href, base) else {
            continue;
        };
        let key = normalize_key(&resolved);
        if seen.insert(key) {
            out.push(resolved);
        }
    }
    debug!(
        base = %base,
        candidates = links.len(),
        kept = out.len(),
        "sanitized links"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_banned_schemes() {
        assert!(validate_absolute("javascript:alert(1)").is_err());
        assert!(validate_absolute("data:text/html,hi").is_err());
        assert!(validate_absolute("file:///etc/passwd").is_err());
        assert!(validate_absolute("vbscript:msgbox").is_err());
        assert!(validate_absolute("about:blank").is_err());
    }

    #[test]
    fn accepts_http_and_https() {
        assert!(validate_absolute("http://example.com").is_ok());
        assert!(validate_absolute("https://example.com/path").is_ok());
        assert!(validate_absolute("ftp://example.com").is_err());
    }

    #[test]
    fn key_strips_trailing_slash_fragment_and_query() {
        let a = Url::parse("https://Example.com/path/").unwrap();
        let b = Url::parse("https://example.com/path#frag").unwrap();
        let c = Url::parse("https://example.com/path?x=1").unwrap();
        assert_eq!(normalize_key(&a), normalize_key(&b));
        assert_eq!(normalize_key(&b), normalize_key(&c));
    }

    #[test]
    fn key_keeps_root_slash() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(normalize_key(&url), "https://example.com/");
    }

    #[test]
    fn sanitize_links_dedups_and_filters() {
        let base = Url::parse("http://example.com/page").unwrap();
        let links = vec![
            "/a".to_string(),
            "/a/".to_string(),
            "/b".to_string(),
            "mailto:x@y".to_string(),
            "javascript:void(0)".to_string(),
        ];
        let sanitized = sanitize_links(&links, &base);
        assert_eq!(sanitized.len(), 2);
        assert!(sanitized.iter().any(|u| u.path() == "/a"));
        assert!(sanitized.iter().any(|u| u.path() == "/b"));
    }

    #[test]
    fn sanitize_links_preserves_first_seen_form() {
        let base = Url::parse("http://example.com/page").unwrap();
        let links = vec!["/a?x=1".to_string(), "/a?x=2".to_string()];
        let sanitized = sanitize_links(&links, &base);
        assert_eq!(sanitized.len(), 1);
        assert_eq!(sanitized[0].query(), Some("x=1"));
    }
}
