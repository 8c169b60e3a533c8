//! Per-domain crawl-policy gate
//!
//! The gate answers one question per address: may we fetch it? The verdict
//! is derived from the domain's robots.txt, evaluated once per domain and
//! memoized for the remainder of the run. Failure to obtain or parse the
//! policy document fails open.

use crate::policy::parser::ParsedRobots;
use crate::url::extract_domain;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::OnceCell;
use url::Url;

/// A memoized per-domain policy verdict
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    /// Whether the configured identity may fetch this domain
    pub allowed: bool,

    /// When the verdict was computed
    pub cached_at: DateTime<Utc>,
}

/// Evaluates and caches per-domain robots policy
///
/// The cache maps domain -> decision and is never evicted within a run;
/// policy is assumed not to change mid-crawl. Concurrent first-touch of a
/// domain by several workers performs exactly one robots.txt fetch: each
/// domain owns a `OnceCell` and all callers await the same initialization.
pub struct PolicyGate {
    client: Client,
    user_agent: String,
    enforce: bool,
    cache: DashMap<String, Arc<OnceCell<PolicyDecision>>>,
}

impl PolicyGate {
    /// Creates a new gate
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client used to fetch robots.txt documents
    /// * `user_agent` - Identity evaluated against robots directives
    /// * `enforce` - When false, every address is allowed without network access
    pub fn new(client: Client, user_agent: String, enforce: bool) -> Self {
        Self {
            client,
            user_agent,
            enforce,
            cache: DashMap::new(),
        }
    }

    /// Checks whether the given address may be fetched
    ///
    /// The first query for a domain fetches and evaluates that domain's
    /// robots.txt; later queries return the memoized verdict.
    pub async fn allowed(&self, address: &Url) -> bool {
        if !self.enforce {
            return true;
        }

        let domain = match extract_domain(address) {
            Some(d) => d,
            None => return true,
        };

        let cell = self
            .cache
            .entry(domain.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let decision = cell
            .get_or_init(|| self.evaluate(domain.clone(), address.clone()))
            .await;

        decision.allowed
    }

    /// Number of domains with a memoized verdict
    pub fn cached_domains(&self) -> usize {
        self.cache.len()
    }

    async fn evaluate(&self, domain: String, address: Url) -> PolicyDecision {
        let robots = match self.fetch_robots(&address).await {
            Ok(robots) => robots,
            Err(reason) => {
                // Availability over strictness: an unreachable or broken
                // policy document never blocks the crawl.
                tracing::warn!(
                    "robots.txt unavailable for {}: {}; failing open",
                    domain,
                    reason
                );
                ParsedRobots::allow_all()
            }
        };

        let allowed = robots.is_allowed(address.as_str(), &self.user_agent);
        if !allowed {
            tracing::info!("domain {} disallows {} by robots.txt", domain, address);
        }

        PolicyDecision {
            allowed,
            cached_at: Utc::now(),
        }
    }

    /// Fetches and parses the robots.txt for the address's own origin
    ///
    /// The policy document is resolved against the address rather than a
    /// bare `https://{domain}` so that non-default ports keep working.
    async fn fetch_robots(&self, address: &Url) -> Result<ParsedRobots, String> {
        let robots_url = address
            .join("/robots.txt")
            .map_err(|e| format!("cannot build robots.txt URL: {}", e))?;

        tracing::debug!("fetching policy document {}", robots_url);

        let response = self
            .client
            .get(robots_url)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            // A missing robots.txt is the common case and imposes no rules.
            return Ok(ParsedRobots::allow_all());
        }

        let body = response.text().await.map_err(|e| e.to_string())?;
        Ok(ParsedRobots::from_content(&body))
    }
}
