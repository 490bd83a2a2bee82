//! Heuristic classifier deciding whether static content needs a dynamic
//! (headless-browser) re-render. Grounded on the shape of
//! `darkscraper-core::waiting_screen::is_waiting_screen`/
//! `estimate_wait_time` — a small, additive, keyword-driven module with a
//! colocated test module — generalized from "is this a DDoS interstitial"
//! to "does this page need JS to render its real content", with the
//! specific framework markers lifted from `darkscraper-parser::html`'s
//! selector scanning. The detector never fetches; it only analyses
//! content already obtained.

use once_cell::sync::Lazy;
use regex::Regex;

use hybridcrawl_core::{DetectionMetrics, DetectionVerdict, Framework};

static SCRIPT_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script>").unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<[^>]+>").unwrap());
static GENERATOR_META_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]+name=["']generator["'][^>]+content=["']([^"']+)["']"#).unwrap()
});

struct Fingerprint {
    framework: Framework,
    markers: &'static [&'static str],
}

const FINGERPRINTS: &[Fingerprint] = &[
    Fingerprint {
        framework: Framework::Nextjs,
        markers: &["__NEXT_DATA__", "__NEXT_LOADED_PAGES__", "next/dist"],
    },
    Fingerprint {
        framework: Framework::Nuxt,
        markers: &["__NUXT__", "nuxt.js"],
    },
    Fingerprint {
        framework: Framework::Angular,
        markers: &["ng-version", "ng-app", "ng-controller"],
    },
    Fingerprint {
        framework: Framework::React,
        markers: &["data-reactroot", "__reactContainer", "react-dom"],
    },
    Fingerprint {
        framework: Framework::Vue,
        markers: &["data-v-", "__vue__"],
    },
];

/// Score `html` (already-fetched, static or rendered) against the
/// additive signal table in spec.md §4.5 and return a clamped verdict.
/// `link_count` is the number of sanitized links already extracted from
/// the same content.
pub fn detect(html: &str, link_count: usize) -> DetectionVerdict {
    let mut confidence = 0.0f64;
    let mut reasons = Vec::new();

    let (framework, fingerprint_matched) = match_fingerprint(html);
    if fingerprint_matched {
        confidence += 0.4;
        reasons.push(format!("framework fingerprint matched: {framework:?}"));
    }

    if link_count < 5 {
        confidence += 0.3;
        reasons.push(format!("fewer than 5 links ({link_count})"));
    }

    let script_count = SCRIPT_TAG_RE.find_iter(html).count();
    let text = visible_text(html);
    let text_length = text.chars().count();
    let content_kb = (text_length as f64 / 1024.0).max(1.0 / 1024.0);
    let script_to_content_ratio = script_count as f64 / content_kb;

    if script_to_content_ratio > 5.0 {
        confidence += 0.2;
        reasons.push(format!(
            "script-to-content ratio {script_to_content_ratio:.1} > 5"
        ));
    }

    if script_count > 10 && text_length < 1000 {
        confidence += 0.2;
        reasons.push(format!(
            "{script_count} script tags with only {text_length} chars of text"
        ));
    }

    if text_length < 500 {
        confidence += 0.1;
        reasons.push(format!("visible text length {text_length} < 500"));
    }

    confidence = confidence.min(1.0);

    DetectionVerdict {
        needs_dynamic: confidence > 0.5,
        confidence,
        reason: if reasons.is_empty() {
            "no dynamic signals detected".to_string()
        } else {
            reasons.join("; ")
        },
        framework: if fingerprint_matched {
            framework
        } else {
            Framework::None
        },
        metrics: DetectionMetrics {
            link_count,
            script_count,
            text_length,
            script_to_content_ratio,
        },
    }
}

fn match_fingerprint(html: &str) -> (Framework, bool) {
    for fp in FINGERPRINTS {
        if fp.markers.iter().any(|m| html.contains(m)) {
            return (fp.framework, true);
        }
    }
    if let Some(caps) = GENERATOR_META_RE.captures(html) {
        let generator = caps
            .get(1)
            .map(|m| m.as_str().to_lowercase())
            .unwrap_or_default();
        if generator.contains("next.js") {
            return (Framework::Nextjs, true);
        }
        if generator.contains("nuxt") {
            return (Framework::Nuxt, true);
        }
    }
    (Framework::None, false)
}

fn visible_text(html: &str) -> String {
    let without_scripts = SCRIPT_TAG_RE.replace_all(html, " ");
    let without_tags = TAG_RE.replace_all(&without_scripts, " ");
    without_tags.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_content_page_does_not_need_dynamic() {
        let html = format!("<html><body><p>{}</p></body></html>", "word ".repeat(300));
        let verdict = detect(&html, 20);
        assert!(!verdict.needs_dynamic);
        assert_eq!(verdict.framework, Framework::None);
    }

    #[test]
    fn react_app_shell_needs_dynamic() {
        let html = r#"<html><body><div id="root" data-reactroot=""></div>
            <script src="/bundle.js"></script></body></html>"#;
        let verdict = detect(html, 2);
        assert!(verdict.needs_dynamic);
        assert_eq!(verdict.framework, Framework::React);
        assert!(verdict.reason.contains("framework fingerprint"));
    }

    #[test]
    fn script_heavy_sparse_text_needs_dynamic() {
        let scripts = "<script>var x = 1;</script>".repeat(15);
        let html = format!("<html><body>{scripts}<p>short</p></body></html>");
        let verdict = detect(&html, 20);
        assert!(verdict.needs_dynamic);
    }

    #[test]
    fn confidence_is_clamped_to_one() {
        let scripts = "<script>var x = 1;</script>".repeat(15);
        let html = format!(r#"<html><body><div data-reactroot="">{scripts}</div></body></html>"#);
        let verdict = detect(&html, 1);
        assert!(verdict.confidence <= 1.0);
    }

    #[test]
    fn generator_meta_tag_identifies_framework() {
        let html = r#"<html><head><meta name="generator" content="Next.js 14"></head><body></body></html>"#;
        let verdict = detect(html, 10);
        assert_eq!(verdict.framework, Framework::Nextjs);
    }
}
