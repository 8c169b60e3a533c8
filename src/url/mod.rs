//! URL handling module
//!
//! Provides address normalization, domain extraction, and the same-domain
//! test that bounds a crawl to its seed site.

mod normalize;

pub use normalize::normalize_url;

use url::Url;

/// Extracts the domain from a URL
///
/// Retrieves the host portion of a URL and converts it to lowercase.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use harvestman::url::extract_domain;
///
/// let url = Url::parse("https://Example.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks whether two addresses belong to the same domain
///
/// The crawl recursion set is restricted to links whose resolved domain
/// equals the source page's domain; cross-domain links are recorded but
/// never enqueued.
pub fn same_domain(base: &Url, target: &Url) -> bool {
    match (extract_domain(base), extract_domain(target)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
