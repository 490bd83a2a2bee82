//! Turns a fetched HTML body into the title/links/metadata triple
//! `PageResult` needs. Grounded on `darkscraper-parser::parse_response`,
//! with entity extraction, content hashing, and registration-form
//! detection dropped — this crate only extracts what a static crawl
//! result records.

pub mod html;

use hybridcrawl_core::PageMetadata;
use url::Url;

/// Max bytes to parse (5 MB). Larger pages are truncated before parsing,
/// matching the teacher's guard against pathologically large bodies.
const MAX_PARSE_SIZE: usize = 5 * 1024 * 1024;

pub struct Extracted {
    pub title: Option<String>,
    pub links: Vec<Url>,
    pub metadata: PageMetadata,
}

/// Parse a raw response body as HTML, producing the title, sanitized
/// absolute links, and page metadata. `content_type` comes from the fetch
/// response's headers since it can't be recovered from the body alone.
pub fn extract(body: &[u8], base_url: &Url, content_type: Option<String>) -> Extracted {
    let truncated = if body.len() > MAX_PARSE_SIZE {
        &body[..MAX_PARSE_SIZE]
    } else {
        body
    };
    let body_str = String::from_utf8_lossy(truncated);

    let page = html::parse_html(&body_str, base_url);
    let metadata = PageMetadata {
        description: page.description,
        keywords: page.keywords,
        author: page.author,
        og_image: page.og_image,
        twitter_card: page.twitter_card,
        favicon: page.favicon,
        language: page.language,
        content_type,
    };

    Extracted {
        title: page.title,
        links: page.links,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_title_links_and_metadata() {
        let base = Url::parse("https://example.com/page").unwrap();
        let html = br#"
            <html lang="en">
              <head>
                <title>Example Page</title>
                <meta name="description" content="A test page">
              </head>
              <body>
                <a href="/a">A</a>
                <a href="https://other.com/b">B</a>
              </body>
            </html>
        "#;
        let extracted = extract(html, &base, Some("text/html".to_string()));
        assert_eq!(extracted.title.as_deref(), Some("Example Page"));
        assert_eq!(extracted.links.len(), 2);
        assert_eq!(extracted.metadata.description.as_deref(), Some("A test page"));
        assert_eq!(extracted.metadata.content_type.as_deref(), Some("text/html"));
    }

    #[test]
    fn truncates_oversized_bodies_without_panicking() {
        let base = Url::parse("https://example.com/").unwrap();
        let mut body = b"<html><body>".to_vec();
        body.extend(std::iter::repeat(b'a').take(MAX_PARSE_SIZE + 1024));
        body.extend(b"</body></html>");
        let extracted = extract(&body, &base, None);
        assert!(extracted.title.is_none());
    }
}
