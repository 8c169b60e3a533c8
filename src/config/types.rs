use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure for Harvestman
///
/// The configuration is an immutable snapshot taken at crawl start. It is
/// serialized verbatim into the output artifact's crawl-info block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub persistence: PersistenceConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Lower bound of the politeness delay before each fetch (seconds)
    #[serde(rename = "delay-min-secs")]
    pub delay_min_secs: f64,

    /// Upper bound of the politeness delay before each fetch (seconds)
    #[serde(rename = "delay-max-secs")]
    pub delay_max_secs: f64,

    /// Ceiling on the number of pages processed in one run
    #[serde(rename = "max-pages")]
    pub max_pages: usize,

    /// Maximum link depth from the seed address
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Number of concurrent workers draining the frontier
    #[serde(rename = "worker-count")]
    pub worker_count: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "fetch-timeout-secs")]
    pub fetch_timeout_secs: u64,

    /// Maximum number of attempts for a transient fetch failure
    #[serde(rename = "retry-ceiling")]
    pub retry_ceiling: u32,

    /// Base delay for exponential retry backoff (milliseconds)
    #[serde(rename = "retry-base-ms")]
    pub retry_base_ms: u64,

    /// Whether to consult robots.txt before fetching
    #[serde(rename = "respect-robots")]
    pub respect_robots: bool,
}

/// Persistence paths for the visited-set cache and the output artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Path to the JSON visited-set cache file
    #[serde(rename = "cache-path")]
    pub cache_path: String,

    /// Path to the JSON output artifact
    #[serde(rename = "output-path")]
    pub output_path: String,
}

impl CrawlerConfig {
    /// Politeness delay bounds as durations
    pub fn delay_range(&self) -> (Duration, Duration) {
        (
            Duration::from_secs_f64(self.delay_min_secs),
            Duration::from_secs_f64(self.delay_max_secs),
        )
    }

    /// Per-request timeout as a duration
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Backoff base as a duration
    pub fn retry_base(&self) -> Duration {
        Duration::from_millis(self.retry_base_ms)
    }
}
