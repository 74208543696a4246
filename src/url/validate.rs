use crate::{UrlError, UrlResult};
use url::Url;

/// Parses a string as an absolute crawlable URL
///
/// Accepts only `http` and `https` URLs with a non-empty host. `http://` on its own
/// is rejected because its host is empty.
///
/// # Examples
///
/// ```
/// use wavecrawl::url::parse_absolute_url;
///
/// assert!(parse_absolute_url("http://google.pl").is_ok());
/// assert!(parse_absolute_url("http://").is_err());
/// assert!(parse_absolute_url("/relative/path").is_err());
/// ```
pub fn parse_absolute_url(raw: &str) -> UrlResult<Url> {
    let url = Url::parse(raw).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlError::MissingHost),
    }
}

/// Returns the lowercase host of a URL
pub fn host_of(url: &Url) -> UrlResult<String> {
    url.host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_lowercase())
        .ok_or(UrlError::MissingHost)
}
