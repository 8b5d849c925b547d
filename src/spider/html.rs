//! HTML parser for extracting links and metadata
//!
//! This module handles parsing HTML content to extract:
//! - Links with their `rel="nofollow"` flag, resolved against `<base href>`
//! - The canonical link
//! - The page title
//! - The visible text used for fingerprinting

use scraper::{Html, Selector};
use url::Url;

/// A link found in an `<a href>` tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    /// Absolute http(s) URL
    pub url: String,

    /// The anchor carries `rel="nofollow"`
    pub nofollow: bool,
}

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedHtml {
    pub title: Option<String>,

    /// Absolute URL of `<link rel="canonical">`, if any
    pub canonical: Option<String>,

    /// Text content outside `<script>`, `<style>` and `<noscript>`
    pub text: String,

    pub links: Vec<ExtractedLink>,
}

/// Parses HTML content and extracts links and metadata
///
/// Relative links resolve against the document's `<base href>` when present,
/// otherwise against `page_url`. `javascript:`, `mailto:`, `tel:`, `data:`,
/// fragment-only and download links are ignored.
///
/// # Example
///
/// ```
/// use sumi_recrawl::spider::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let page_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &page_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links[0].url, "https://example.com/page");
/// ```
pub fn parse_html(html: &str, page_url: &Url) -> ParsedHtml {
    let document = Html::parse_document(html);
    let base_url = extract_base(&document, page_url);

    ParsedHtml {
        title: extract_title(&document),
        canonical: extract_canonical(&document, &base_url),
        text: extract_text(&document),
        links: extract_links(&document, &base_url),
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// The `<base href>` of the document, resolved against the page URL
fn extract_base(document: &Html, page_url: &Url) -> Url {
    selector("base[href]")
        .and_then(|sel| {
            document
                .select(&sel)
                .next()
                .and_then(|el| el.value().attr("href"))
                .and_then(|href| page_url.join(href.trim()).ok())
        })
        .unwrap_or_else(|| page_url.clone())
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = selector("title")?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_canonical(document: &Html, base_url: &Url) -> Option<String> {
    let canonical_selector = selector("link[rel='canonical'][href]")?;

    document
        .select(&canonical_selector)
        .filter_map(|el| el.value().attr("href"))
        .find_map(|href| resolve_link(href, base_url))
}

fn extract_text(document: &Html) -> String {
    let mut text = String::new();

    for node in document.root_element().descendants() {
        let Some(chunk) = node.value().as_text() else {
            continue;
        };

        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element().map(|el| el.name()))
            .is_some_and(|name| matches!(name, "script" | "style" | "noscript"));
        if hidden {
            continue;
        }

        text.push_str(chunk);
        text.push(' ');
    }

    text
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<ExtractedLink> {
    let Some(a_selector) = selector("a[href]") else {
        return Vec::new();
    };

    document
        .select(&a_selector)
        .filter(|el| el.value().attr("download").is_none())
        .filter_map(|el| {
            let href = el.value().attr("href")?;
            let url = resolve_link(href, base_url)?;
            let nofollow = el
                .value()
                .attr("rel")
                .is_some_and(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("nofollow")));
            Some(ExtractedLink { url, nofollow })
        })
        .collect()
}

/// Resolves a link href to an absolute http(s) URL
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
        Some(absolute_url.to_string())
    } else {
        None
    }
}
