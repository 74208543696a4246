use url::Url;

/// Returns `scheme://host[:port]` for a URL
///
/// The port is only present when it differs from the scheme's default.
pub fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Resolves an href found on a page into an absolute URL
///
/// Resolution is deliberately shallow: anything that is not already an absolute
/// http(s) URL is concatenated onto the page's origin. Path-relative hrefs are
/// anchored at the origin root rather than at the page's directory.
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel:, data: schemes
/// - empty and fragment-only hrefs
/// - absolute URLs with non-HTTP(S) schemes
///
/// # Examples
///
/// ```
/// use url::Url;
/// use wavecrawl::url::resolve_against_origin;
///
/// let page = Url::parse("https://example.com/docs/intro").unwrap();
/// assert_eq!(
///     resolve_against_origin("/about", &page),
///     Some("https://example.com/about".to_string())
/// );
/// assert_eq!(
///     resolve_against_origin("guide", &page),
///     Some("https://example.com/guide".to_string())
/// );
/// ```
pub fn resolve_against_origin(href: &str, page: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    // Skip special schemes
    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    if let Ok(absolute) = Url::parse(href) {
        return match absolute.scheme() {
            "http" | "https" => Some(absolute.to_string()),
            _ => None,
        };
    }

    if let Some(rest) = href.strip_prefix("//") {
        return Some(format!("{}://{}", page.scheme(), rest));
    }

    let origin = origin_of(page);
    if href.starts_with('/') {
        Some(format!("{}{}", origin, href))
    } else {
        Some(format!("{}/{}", origin, href))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://example.com/section/page").unwrap()
    }

    #[test]
    fn test_origin_keeps_non_default_port() {
        let url = Url::parse("http://127.0.0.1:8080/index.html").unwrap();
        assert_eq!(origin_of(&url), "http://127.0.0.1:8080");

        let url = Url::parse("https://example.com:443/").unwrap();
        assert_eq!(origin_of(&url), "https://example.com");
    }

    #[test]
    fn test_absolute_link_kept() {
        assert_eq!(
            resolve_against_origin("https://other.com/page", &page()),
            Some("https://other.com/page".to_string())
        );
    }

    #[test]
    fn test_root_relative_link() {
        assert_eq!(
            resolve_against_origin("/other", &page()),
            Some("https://example.com/other".to_string())
        );
    }

    #[test]
    fn test_path_relative_link_anchors_at_origin() {
        assert_eq!(
            resolve_against_origin("other", &page()),
            Some("https://example.com/other".to_string())
        );
    }

    #[test]
    fn test_protocol_relative_link() {
        assert_eq!(
            resolve_against_origin("//cdn.example.com/lib", &page()),
            Some("https://cdn.example.com/lib".to_string())
        );
    }

    #[test]
    fn test_skips_special_schemes() {
        assert_eq!(resolve_against_origin("javascript:void(0)", &page()), None);
        assert_eq!(resolve_against_origin("mailto:a@b.com", &page()), None);
        assert_eq!(resolve_against_origin("tel:+123", &page()), None);
        assert_eq!(resolve_against_origin("data:text/html,hi", &page()), None);
        assert_eq!(resolve_against_origin("ftp://example.com/f", &page()), None);
    }

    #[test]
    fn test_skips_fragment_and_empty() {
        assert_eq!(resolve_against_origin("#top", &page()), None);
        assert_eq!(resolve_against_origin("   ", &page()), None);
    }
}
