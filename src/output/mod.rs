//! Output artifact handling
//!
//! Writes the finished crawl to a single JSON artifact and reads it back
//! for reporting. The export/report layer only ever touches the finished
//! artifact; it is never invoked mid-crawl.

mod stats;

pub use stats::{print_statistics, RunStatistics};

use crate::config::Config;
use crate::crawler::CrawlOutcome;
use crate::extract::PageRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Metadata block of the output artifact
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlInfo {
    pub start_time: DateTime<Utc>,
    pub total_pages: usize,
    pub failed_targets: usize,
    pub config: Config,
}

/// The complete output artifact
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlOutput {
    pub crawl_info: CrawlInfo,
    pub pages: Vec<PageRecord>,
}

/// Writes the output artifact for a finished run
pub fn write_output(path: &Path, config: &Config, outcome: &CrawlOutcome) -> crate::Result<()> {
    let output = CrawlOutput {
        crawl_info: CrawlInfo {
            start_time: outcome.started_at,
            total_pages: outcome.records.len(),
            failed_targets: outcome.failed_targets,
            config: config.clone(),
        },
        pages: outcome.records.clone(),
    };

    let json = serde_json::to_string_pretty(&output)?;
    std::fs::write(path, json)?;

    tracing::info!(
        "wrote {} page records to {}",
        output.pages.len(),
        path.display()
    );
    Ok(())
}

/// Reads a previously written output artifact
pub fn load_output(path: &Path) -> crate::Result<CrawlOutput> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
