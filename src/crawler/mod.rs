//! Crawl engine
//!
//! The concurrent core: a shared frontier drained by a fixed pool of
//! workers, each performing gate -> fetch -> extract -> frontier-refill,
//! coordinated to a quiescence-based stop with cooperative cancellation.

mod coordinator;
mod frontier;
mod progress;
mod worker;

pub use coordinator::{Coordinator, CrawlOutcome};
pub use frontier::{CrawlTarget, Frontier};
pub use progress::{ProgressBus, ProgressEvent};

use crate::config::Config;
use crate::output::write_output;
use std::path::Path;
use url::Url;

/// Runs a complete crawl and writes the output artifact
///
/// This is the main library entry point: it builds a coordinator, runs it,
/// and writes the JSON artifact to the configured output path. A failed
/// artifact write is logged and does not fail the run.
pub async fn crawl(config: Config, seed: Url, fresh: bool) -> crate::Result<CrawlOutcome> {
    let output_path = config.persistence.output_path.clone();
    let coordinator = Coordinator::new(config.clone(), seed);
    let outcome = coordinator.run(fresh).await?;

    if let Err(e) = write_output(Path::new(&output_path), &config, &outcome) {
        tracing::error!("failed to write output artifact {}: {}", output_path, e);
    }

    Ok(outcome)
}
