//! Crawl coordinator
//!
//! Owns the shared state for one run, spawns the worker pool, seeds the
//! frontier, waits for quiescence or cancellation, and persists the visited
//! set on the way out. Per-target failures never abort the run; the one
//! run-level failure is a seed address that could not be fetched.

use crate::config::Config;
use crate::crawler::frontier::{CrawlTarget, Frontier};
use crate::crawler::progress::{ProgressBus, ProgressEvent};
use crate::crawler::worker::{run_worker, WorkerContext};
use crate::extract::{DefaultExtractor, PageExtractor, PageRecord};
use crate::fetch::{build_http_client, AuditLog, FetchAttempt, Fetcher};
use crate::policy::PolicyGate;
use crate::state::VisitedSet;
use crate::HarvestError;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Identity presented to robots.txt evaluation
const GATE_IDENTITY: &str = concat!("harvestman/", env!("CARGO_PKG_VERSION"));

/// Everything a finished run produced
#[derive(Debug)]
pub struct CrawlOutcome {
    /// One record per successfully fetched and parsed page
    pub records: Vec<PageRecord>,

    /// Every fetch attempt made during the run
    pub audit: Vec<FetchAttempt>,

    /// Targets that failed terminally (retries exhausted or 4xx)
    pub failed_targets: usize,

    pub started_at: DateTime<Utc>,
}

/// Orchestrates one crawl run
pub struct Coordinator {
    config: Config,
    seed: Url,
    extractor: Arc<dyn PageExtractor>,
    progress: ProgressBus,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Creates a coordinator with the standard extractor
    pub fn new(config: Config, seed: Url) -> Self {
        Self::with_extractor(config, seed, Arc::new(DefaultExtractor))
    }

    /// Creates a coordinator with a caller-supplied extraction strategy
    pub fn with_extractor(config: Config, seed: Url, extractor: Arc<dyn PageExtractor>) -> Self {
        Self {
            config,
            seed,
            extractor,
            progress: ProgressBus::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Subscribes to the progress event stream
    pub fn subscribe_progress(&self) -> tokio::sync::broadcast::Receiver<ProgressEvent> {
        self.progress.subscribe()
    }

    /// Returns a handle the presentation layer can use to request a stop
    ///
    /// Workers observe the signal between steps; in-flight fetches finish or
    /// time out on their own.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the crawl to completion or cancellation
    ///
    /// With `fresh` set, the persisted visited cache is ignored; otherwise
    /// it is merged in at startup so previously processed addresses are
    /// skipped.
    pub async fn run(&self, fresh: bool) -> crate::Result<CrawlOutcome> {
        let started_at = Utc::now();
        let crawler = &self.config.crawler;

        // Workers get a child token: an external stop request propagates to
        // them, while the internal stop at the end of a quiescent run does
        // not mark the caller-visible handle as cancelled.
        let run_cancel = self.cancel.child_token();

        let visited = Arc::new(VisitedSet::new());
        let cache_path = Path::new(&self.config.persistence.cache_path);
        if fresh {
            tracing::info!("fresh run: ignoring visited cache");
        } else {
            visited.load_from(cache_path);
        }

        let client = build_http_client(crawler.fetch_timeout())?;
        let gate = Arc::new(PolicyGate::new(
            client.clone(),
            GATE_IDENTITY.to_string(),
            crawler.respect_robots,
        ));
        let audit = Arc::new(AuditLog::new());
        let fetcher = Arc::new(Fetcher::new(client, crawler, audit.clone()));
        let frontier = Arc::new(Frontier::new(visited.clone()));

        let records = Arc::new(Mutex::new(Vec::new()));
        let failed_targets = Arc::new(AtomicUsize::new(0));
        let seed_failure = Arc::new(Mutex::new(None));

        self.progress.publish(ProgressEvent::Started {
            seed: self.seed.to_string(),
        });

        // A seed already present in the merged cache makes this push a
        // no-op; the frontier starts quiescent and the run ends with zero
        // new records.
        let seeded = frontier.push(CrawlTarget {
            address: self.seed.clone(),
            depth: 0,
        });
        if !seeded {
            tracing::info!("seed {} already visited, nothing to do", self.seed);
        }

        let context = Arc::new(WorkerContext {
            max_pages: crawler.max_pages,
            max_depth: crawler.max_depth,
            frontier: frontier.clone(),
            visited: visited.clone(),
            gate,
            fetcher,
            extractor: self.extractor.clone(),
            records: records.clone(),
            failed_targets: failed_targets.clone(),
            seed_failure: seed_failure.clone(),
            progress: self.progress.clone(),
            cancel: run_cancel.clone(),
        });

        tracing::info!(
            "starting {} workers (max {} pages, depth {})",
            crawler.worker_count,
            crawler.max_pages,
            crawler.max_depth
        );

        let mut handles = Vec::with_capacity(crawler.worker_count as usize);
        for id in 0..crawler.worker_count {
            handles.push(tokio::spawn(run_worker(id, context.clone())));
        }

        // Block until every queued item is drained AND no worker is
        // mid-flight; an empty queue alone is not enough, since a worker may
        // be about to enqueue more work.
        tokio::select! {
            _ = frontier.wait_quiescent() => {
                tracing::info!("frontier quiescent, crawl complete");
            }
            _ = run_cancel.cancelled() => {
                tracing::info!("stop requested, shutting down workers");
            }
        }

        run_cancel.cancel();
        for handle in handles {
            let _ = handle.await;
        }

        // Persist on both the normal and the cancelled path so the next run
        // does not reprocess this one's pages.
        if let Err(e) = visited.persist_to(cache_path) {
            tracing::error!(
                "failed to persist visited cache {}: {}; continuing with in-memory state",
                cache_path.display(),
                e
            );
        }

        let records = std::mem::take(&mut *records.lock().unwrap());
        let failed_targets = failed_targets.load(Ordering::Relaxed);

        self.progress.publish(ProgressEvent::Finished {
            total_pages: records.len(),
        });

        if let Some(reason) = seed_failure.lock().unwrap().take() {
            return Err(HarvestError::SeedUnreachable {
                url: self.seed.to_string(),
                reason,
            });
        }

        tracing::info!(
            "crawl finished: {} pages, {} failed targets, {} fetch attempts",
            records.len(),
            failed_targets,
            audit.len()
        );

        Ok(CrawlOutcome {
            records,
            audit: audit.snapshot(),
            failed_targets,
            started_at,
        })
    }
}
