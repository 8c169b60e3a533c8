//! Harvestman: a site-bounded web harvester
//!
//! This crate implements a concurrent web crawler that walks a single site
//! from a seed address, respecting robots.txt, and produces one structured
//! record per fetched page.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod fetch;
pub mod output;
pub mod policy;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Harvestman operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Seed address unreachable: {url}: {reason}")]
    SeedUnreachable { url: String, reason: String },

    #[error("Fetch error: {0}")]
    Fetch(#[from] fetch::FetchError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Harvestman operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, Coordinator, CrawlOutcome, ProgressEvent};
pub use extract::{DefaultExtractor, PageExtractor, PageRecord};
pub use state::{ClaimOutcome, VisitedSet};
pub use crate::url::{extract_domain, normalize_url, same_domain};
