use crate::UrlError;
use url::Url;

/// Normalizes an address before it enters the frontier or the visited set
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject schemes other than HTTP and HTTPS
/// 3. Lowercase the host
/// 4. Remove the fragment (everything after #)
/// 5. Empty path becomes /
///
/// Two addresses that differ only in fragment or host casing are the same
/// page for dedup purposes; anything stronger (query reordering, tracking
/// parameter removal) risks conflating genuinely distinct pages.
///
/// # Examples
///
/// ```
/// use harvestman::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.com/page#section").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/page");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = match url.host_str() {
        Some(h) => h.to_lowercase(),
        None => return Err(UrlError::MissingDomain),
    };
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;

    url.set_fragment(None);

    if url.path().is_empty() {
        url.set_path("/");
    }

    Ok(url)
}
