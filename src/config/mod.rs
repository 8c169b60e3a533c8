//! Configuration module
//!
//! Handles loading, parsing, and validating the TOML configuration file.

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{Config, CrawlerConfig, PersistenceConfig};
pub use validation::validate;
