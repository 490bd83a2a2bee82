//! HTML structural extraction: title, links, and metadata. Grounded on
//! `darkscraper-parser::html::parse_html`/`extract_meta_content`,
//! generalized from the teacher's dark-web link classification and
//! registration-form detectors (no counterpart here) to the metadata
//! fields a static crawler needs: description, keywords, author, Open
//! Graph image, Twitter card, favicon, and declared language.

use hybridcrawl_core::sanitize_links;
use scraper::{ElementRef, Html, Selector};
use url::Url;

pub struct ExtractedPage {
    pub title: Option<String>,
    pub links: Vec<Url>,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub author: Option<String>,
    pub og_image: Option<String>,
    pub twitter_card: Option<String>,
    pub favicon: Option<String>,
    pub language: Option<String>,
}

pub fn parse_html(html_str: &str, base_url: &Url) -> ExtractedPage {
    let document = Html::parse_document(html_str);

    let title = select_one(&document, "title")
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let raw_links: Vec<String> = selector("a[href]")
        .map(|sel| {
            document
                .select(&sel)
                .filter_map(|el| el.value().attr("href").map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    let links = sanitize_links(&raw_links, base_url);

    let description = extract_meta_by(&document, "name", "description");
    let keywords = extract_meta_by(&document, "name", "keywords")
        .map(|k| {
            k.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();
    let author = extract_meta_by(&document, "name", "author");
    let og_image = extract_meta_by(&document, "property", "og:image")
        .and_then(|href| base_url.join(&href).ok())
        .map(|u| u.to_string());
    let twitter_card = extract_meta_by(&document, "name", "twitter:card");
    let favicon = extract_favicon(&document, base_url);
    let language =
        select_one(&document, "html").and_then(|el| el.value().attr("lang").map(str::to_string));

    ExtractedPage {
        title,
        links,
        description,
        keywords,
        author,
        og_image,
        twitter_card,
        favicon,
        language,
    }
}

fn selector(s: &str) -> Option<Selector> {
    Selector::parse(s).ok()
}

fn select_one<'a>(document: &'a Html, sel: &str) -> Option<ElementRef<'a>> {
    selector(sel).and_then(|s| document.select(&s).next())
}

fn extract_meta_by(document: &Html, attr: &str, value: &str) -> Option<String> {
    let sel_str = format!("meta[{attr}='{value}']");
    select_one(document, &sel_str).and_then(|el| el.value().attr("content").map(str::to_string))
}

/// Prefer an explicit `<link rel="icon">` (or `shortcut icon`/`apple-touch-icon`);
/// fall back to the conventional `/favicon.ico` at the site root, since most
/// sites serve one there even without declaring it.
fn extract_favicon(document: &Html, base_url: &Url) -> Option<String> {
    if let Some(sel) = selector("link[rel='icon'], link[rel='shortcut icon'], link[rel='apple-touch-icon']") {
        if let Some(el) = document.select(&sel).next() {
            if let Some(href) = el.value().attr("href") {
                if let Ok(resolved) = base_url.join(href) {
                    return Some(resolved.to_string());
                }
            }
        }
    }
    base_url.join("/favicon.ico").ok().map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_title_and_metadata() {
        let base = Url::parse("https://example.com/page").unwrap();
        let html = r#"
            <html lang="en">
              <head>
                <title>Example Page</title>
                <meta name="description" content="A test page">
                <meta name="keywords" content="foo, bar, baz">
                <meta name="author" content="Jane Doe">
                <meta property="og:image" content="/img.png">
                <meta name="twitter:card" content="summary">
                <link rel="icon" href="/favicon.png">
              </head>
              <body></body>
            </html>
        "#;
        let page = parse_html(html, &base);
        assert_eq!(page.title.as_deref(), Some("Example Page"));
        assert_eq!(page.description.as_deref(), Some("A test page"));
        assert_eq!(page.keywords, vec!["foo", "bar", "baz"]);
        assert_eq!(page.author.as_deref(), Some("Jane Doe"));
        assert_eq!(page.og_image.as_deref(), Some("https://example.com/img.png"));
        assert_eq!(page.twitter_card.as_deref(), Some("summary"));
        assert_eq!(page.favicon.as_deref(), Some("https://example.com/favicon.png"));
        assert_eq!(page.language.as_deref(), Some("en"));
    }

    #[test]
    fn extracts_and_dedups_links() {
        let base = Url::parse("http://example.com/page").unwrap();
        let html = r#"
            <html><body>
              <a href="/a">A</a>
              <a href="/a/">A dup</a>
              <a href="javascript:void(0)">skip</a>
              <a href="https://other.com/b">B</a>
            </body></html>
        "#;
        let page = parse_html(html, &base);
        assert_eq!(page.links.len(), 2);
    }

    #[test]
    fn missing_tags_yield_none() {
        let base = Url::parse("https://example.com/").unwrap();
        let html = "<html><body><p>no head tags</p></body></html>";
        let page = parse_html(html, &base);
        assert!(page.title.is_none());
        assert!(page.description.is_none());
        assert!(page.author.is_none());
        assert!(page.language.is_none());
    }

    #[test]
    fn falls_back_to_default_favicon_path() {
        let base = Url::parse("https://example.com/deep/page").unwrap();
        let html = "<html><head><title>No icon link</title></head><body></body></html>";
        let page = parse_html(html, &base);
        assert_eq!(page.favicon.as_deref(), Some("https://example.com/favicon.ico"));
    }
}
