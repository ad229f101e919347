// src/utils/html.rs

//! HTML text helpers.

use std::collections::HashSet;

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::utils::text::collapse_whitespace;
use crate::utils::url::resolve;

/// Elements whose text is never user-visible content.
const INVISIBLE_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Parse a CSS selector, mapping failures to `AppError::Selector`.
pub fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Visible text of an HTML document or fragment, whitespace-collapsed.
pub fn strip_html(html: &str) -> String {
    let document = Html::parse_document(html);
    visible_text(document.root_element())
}

/// Visible text below an element, skipping script/style content.
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut parts: Vec<&str> = Vec::new();

    for node in element.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| INVISIBLE_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            parts.push(text);
        }
    }

    collapse_whitespace(&parts.join(" "))
}

/// Absolute URLs of all `<a href>` links, in document order, deduplicated.
///
/// `javascript:`, `mailto:`, `tel:` and fragment-only links are skipped.
pub fn extract_links(html: &str, base_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in document.select(&selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        let lower = href.to_lowercase();
        if href.is_empty()
            || href.starts_with('#')
            || lower.starts_with("javascript:")
            || lower.starts_with("mailto:")
            || lower.starts_with("tel:")
        {
            continue;
        }

        let absolute = resolve(base_url, href);
        if seen.insert(absolute.clone()) {
            links.push(absolute);
        }
    }
    links
}

/// Text of the first element matching `selector` under `scope`.
pub fn first_text(scope: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_html_skips_scripts() {
        let html = r#"<html><head><title>T</title><style>.a{}</style></head>
            <body><h1>Karrieredag</h1><script>var x = 1;</script>
            <p>Oslo   Spektrum</p></body></html>"#;
        assert_eq!(strip_html(html), "Karrieredag Oslo Spektrum");
    }

    #[test]
    fn test_extract_links() {
        let html = r##"
            <a href="/e/1">One</a>
            <a href="https://other.no/x">Two</a>
            <a href="/e/1">Dup</a>
            <a href="#top">Top</a>
            <a href="mailto:a@b.no">Mail</a>
            <a href="javascript:void(0)">JS</a>
        "##;
        assert_eq!(
            extract_links(html, "https://example.no/list/"),
            vec!["https://example.no/e/1", "https://other.no/x"]
        );
    }

    #[test]
    fn test_parse_selector() {
        assert!(parse_selector("article.event-card h2 a").is_ok());
        assert!(parse_selector("[[invalid").is_err());
    }

    #[test]
    fn test_first_text() {
        let document = Html::parse_document("<div><span class='d'> 12.  mars </span></div>");
        let selector = parse_selector(".d").unwrap();
        assert_eq!(
            first_text(&document.root_element(), &selector),
            Some("12. mars".to_string())
        );
    }
}
