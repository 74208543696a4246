//! HTML parser for extracting links
//!
//! Only `<a href>` anchors are followed. Every href is resolved against the
//! page's origin, see [`crate::url::resolve_against_origin`].

use crate::url::resolve_against_origin;
use scraper::{Html, Selector};
use url::Url;

/// Extracts all followable links from an HTML document
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only and empty hrefs
///
/// Links are returned in document order and may contain duplicates.
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `page_url` - The URL the document was served from
///
/// # Example
///
/// ```
/// use wavecrawl::crawler::extract_links;
/// use url::Url;
///
/// let html = r#"<html><body><a href="/page">Link</a></body></html>"#;
/// let page = Url::parse("https://example.com/docs/").unwrap();
/// assert_eq!(extract_links(html, &page), vec!["https://example.com/page".to_string()]);
/// ```
pub fn extract_links(html: &str, page_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return links;
    };

    for element in document.select(&a_selector) {
        // Skip if it has the download attribute
        if element.value().attr("download").is_some() {
            continue;
        }

        if let Some(href) = element.value().attr("href") {
            if let Some(absolute_url) = resolve_against_origin(href, page_url) {
                links.push(absolute_url);
            }
        }
    }

    links
}
