//! Page extraction
//!
//! Turns a fetched body into a [`PageRecord`]. Extraction is a pure function
//! of the address and body: no I/O, no shared state, and no failure mode.
//! Malformed markup yields a best-effort record with empty collections.
//!
//! The extraction strategy is pluggable: the coordinator accepts any
//! [`PageExtractor`] implementation, so callers can substitute their own
//! record shape without touching the crawl engine.

use crate::url::same_domain;
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use url::Url;

/// Elements whose text is navigation or machinery rather than content
const STRIPPED_ELEMENTS: &[&str] = &["script", "style", "nav", "footer"];

/// An image reference found on a page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    /// Absolute image address
    pub src: String,
    /// Alternative text, empty when absent
    pub alt: String,
}

/// An outbound link found on a page
///
/// Only links resolving to the source page's own domain are retained; the
/// crawl is bounded to one site by design.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundLink {
    /// Absolute link address
    pub url: String,
    /// Anchor text, whitespace-collapsed
    pub anchor_text: String,
    /// The anchor's title attribute, empty when absent
    pub title: String,
}

/// The structured record produced from one successfully fetched page
///
/// Immutable after creation; the accumulation store appends records and the
/// visited-set invariant guarantees each address appears at most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    pub address: String,
    /// SHA-256 hex digest of the raw body
    pub content_digest: String,
    pub title: String,
    pub meta_description: String,
    pub meta_keywords: Vec<String>,
    /// Heading texts keyed by level, `h1` through `h6`
    pub headings: BTreeMap<String, Vec<String>>,
    pub images: Vec<ImageRef>,
    pub outbound_links: Vec<OutboundLink>,
    /// Plain text with script/style/nav/footer stripped
    pub text_body: String,
    pub word_count: usize,
    pub fetched_at: DateTime<Utc>,
}

/// Pluggable extraction strategy
///
/// Implementations must be pure with respect to shared state and must never
/// panic on malformed input.
pub trait PageExtractor: Send + Sync {
    fn extract(&self, address: &Url, body: &str) -> PageRecord;
}

/// The standard extractor: titles, metadata, headings, images, same-domain
/// links, and stripped text content
#[derive(Debug, Default)]
pub struct DefaultExtractor;

impl PageExtractor for DefaultExtractor {
    fn extract(&self, address: &Url, body: &str) -> PageRecord {
        let document = Html::parse_document(body);

        let content_digest = {
            let mut hasher = Sha256::new();
            hasher.update(body.as_bytes());
            hex::encode(hasher.finalize())
        };

        let title = select_first_text(&document, "title");
        let (meta_description, meta_keywords) = extract_meta(&document);
        let headings = extract_headings(&document);
        let images = extract_images(&document, address);
        let outbound_links = extract_links(&document, address);

        let mut text_body = String::new();
        collect_text(document.root_element(), &mut text_body);
        let text_body = collapse_whitespace(&text_body);
        let word_count = text_body.split_whitespace().count();

        PageRecord {
            address: address.to_string(),
            content_digest,
            title,
            meta_description,
            meta_keywords,
            headings,
            images,
            outbound_links,
            text_body,
            word_count,
            fetched_at: Utc::now(),
        }
    }
}

fn select_first_text(document: &Html, selector: &str) -> String {
    let Ok(sel) = Selector::parse(selector) else {
        return String::new();
    };
    document
        .select(&sel)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .unwrap_or_default()
}

fn extract_meta(document: &Html) -> (String, Vec<String>) {
    let mut description = String::new();
    let mut keywords = Vec::new();

    if let Ok(sel) = Selector::parse("meta[name][content]") {
        for element in document.select(&sel) {
            let name = element.value().attr("name").unwrap_or("").to_lowercase();
            let content = element.value().attr("content").unwrap_or("");

            match name.as_str() {
                "description" => description = content.trim().to_string(),
                "keywords" => {
                    keywords = content
                        .split(',')
                        .map(str::trim)
                        .filter(|kw| !kw.is_empty())
                        .map(String::from)
                        .collect();
                }
                _ => {}
            }
        }
    }

    (description, keywords)
}

fn extract_headings(document: &Html) -> BTreeMap<String, Vec<String>> {
    let mut headings = BTreeMap::new();

    for level in 1..=6 {
        let key = format!("h{}", level);
        let texts = match Selector::parse(&key) {
            Ok(sel) => document
                .select(&sel)
                .map(|el| collapse_whitespace(&el.text().collect::<String>()))
                .filter(|t| !t.is_empty())
                .collect(),
            Err(_) => Vec::new(),
        };
        headings.insert(key, texts);
    }

    headings
}

fn extract_images(document: &Html, base: &Url) -> Vec<ImageRef> {
    let Ok(sel) = Selector::parse("img[src]") else {
        return Vec::new();
    };

    document
        .select(&sel)
        .filter_map(|element| {
            let src = element.value().attr("src")?;
            let resolved = base.join(src.trim()).ok()?;
            Some(ImageRef {
                src: resolved.to_string(),
                alt: element.value().attr("alt").unwrap_or("").to_string(),
            })
        })
        .collect()
}

fn extract_links(document: &Html, base: &Url) -> Vec<OutboundLink> {
    let Ok(sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut links = Vec::new();
    for element in document.select(&sel) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();

        if href.is_empty() || href.starts_with('#') {
            continue;
        }
        if href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
            || href.starts_with("data:")
        {
            continue;
        }

        let Ok(resolved) = base.join(href) else {
            continue;
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            continue;
        }

        // Cross-domain links are discovered but excluded: the crawl stays on
        // the seed's site.
        if !same_domain(base, &resolved) {
            continue;
        }

        links.push(OutboundLink {
            url: resolved.to_string(),
            anchor_text: collapse_whitespace(&element.text().collect::<String>()),
            title: element.value().attr("title").unwrap_or("").to_string(),
        });
    }

    links
}

/// Collects text content, skipping stripped elements
fn collect_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            if !STRIPPED_ELEMENTS.contains(&child_element.value().name()) {
                collect_text(child_element, out);
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(body: &str) -> PageRecord {
        let address = Url::parse("https://example.com/page").unwrap();
        DefaultExtractor.extract(&address, body)
    }

    #[test]
    fn test_extract_title() {
        let record = extract("<html><head><title>  Test Page  </title></head><body></body></html>");
        assert_eq!(record.title, "Test Page");
    }

    #[test]
    fn test_missing_title_is_empty() {
        let record = extract("<html><head></head><body></body></html>");
        assert_eq!(record.title, "");
    }

    #[test]
    fn test_meta_description_and_keywords() {
        let record = extract(
            r#"<html><head>
            <meta name="description" content="A page about things">
            <meta name="keywords" content="rust, crawler ,  web,">
            </head><body></body></html>"#,
        );
        assert_eq!(record.meta_description, "A page about things");
        assert_eq!(record.meta_keywords, vec!["rust", "crawler", "web"]);
    }

    #[test]
    fn test_headings_by_level() {
        let record = extract(
            r#"<html><body>
            <h1>Top</h1>
            <h2>Second A</h2>
            <h2>Second B</h2>
            </body></html>"#,
        );
        assert_eq!(record.headings["h1"], vec!["Top"]);
        assert_eq!(record.headings["h2"], vec!["Second A", "Second B"]);
        assert!(record.headings["h3"].is_empty());
        // Every level is present even when empty
        assert_eq!(record.headings.len(), 6);
    }

    #[test]
    fn test_images_resolved_absolute() {
        let record = extract(r#"<html><body><img src="/pics/logo.png" alt="Logo"></body></html>"#);
        assert_eq!(record.images.len(), 1);
        assert_eq!(record.images[0].src, "https://example.com/pics/logo.png");
        assert_eq!(record.images[0].alt, "Logo");
    }

    #[test]
    fn test_image_without_alt() {
        let record = extract(r#"<html><body><img src="x.png"></body></html>"#);
        assert_eq!(record.images[0].alt, "");
    }

    #[test]
    fn test_same_domain_links_kept() {
        let record = extract(
            r#"<html><body>
            <a href="/about" title="About us">About</a>
            <a href="https://example.com/contact">Contact</a>
            </body></html>"#,
        );
        assert_eq!(record.outbound_links.len(), 2);
        assert_eq!(record.outbound_links[0].url, "https://example.com/about");
        assert_eq!(record.outbound_links[0].anchor_text, "About");
        assert_eq!(record.outbound_links[0].title, "About us");
    }

    #[test]
    fn test_cross_domain_links_excluded() {
        let record = extract(r#"<html><body><a href="https://other.com/page">Out</a></body></html>"#);
        assert!(record.outbound_links.is_empty());
    }

    #[test]
    fn test_special_scheme_links_excluded() {
        let record = extract(
            r##"<html><body>
            <a href="javascript:void(0)">JS</a>
            <a href="mailto:a@example.com">Mail</a>
            <a href="tel:+123">Call</a>
            <a href="#section">Anchor</a>
            </body></html>"##,
        );
        assert!(record.outbound_links.is_empty());
    }

    #[test]
    fn test_text_strips_script_style_nav_footer() {
        let record = extract(
            r#"<html><body>
            <nav>Menu Home</nav>
            <p>Real content here</p>
            <script>var x = 1;</script>
            <style>.a { color: red }</style>
            <footer>Copyright</footer>
            </body></html>"#,
        );
        assert!(record.text_body.contains("Real content here"));
        assert!(!record.text_body.contains("Menu"));
        assert!(!record.text_body.contains("var x"));
        assert!(!record.text_body.contains("color"));
        assert!(!record.text_body.contains("Copyright"));
    }

    #[test]
    fn test_word_count() {
        let record = extract("<html><body><p>one two three</p></body></html>");
        assert_eq!(record.word_count, 3);
    }

    #[test]
    fn test_content_digest_is_stable() {
        let a = extract("<html><body>same</body></html>");
        let b = extract("<html><body>same</body></html>");
        let c = extract("<html><body>different</body></html>");
        assert_eq!(a.content_digest, b.content_digest);
        assert_ne!(a.content_digest, c.content_digest);
        assert_eq!(a.content_digest.len(), 64);
    }

    #[test]
    fn test_malformed_markup_never_panics() {
        let record = extract("<html><body><div><p>unclosed <a href='/x'>link");
        assert_eq!(record.outbound_links.len(), 1);
        assert!(record.text_body.contains("unclosed"));
    }

    #[test]
    fn test_garbage_input_yields_complete_record() {
        let record = extract(">>> not <<< html ]]] at {{{ all");
        assert_eq!(record.title, "");
        assert_eq!(record.meta_description, "");
        assert!(record.meta_keywords.is_empty());
        assert_eq!(record.headings.len(), 6);
        assert!(record.images.is_empty());
        assert!(record.outbound_links.is_empty());
        assert!(record.word_count > 0);
    }

    #[test]
    fn test_empty_body() {
        let record = extract("");
        assert_eq!(record.word_count, 0);
        assert_eq!(record.text_body, "");
        assert!(record.outbound_links.is_empty());
    }
}
