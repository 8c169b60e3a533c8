//! Crawl worker
//!
//! Each worker drains the frontier in a loop: pop, claim, gate, fetch,
//! extract, enqueue discovered links. Workers observe the stop signal
//! between steps; an in-flight fetch runs to completion or its own timeout
//! rather than being aborted mid-request.

use crate::crawler::frontier::{CrawlTarget, Frontier};
use crate::crawler::progress::{ProgressBus, ProgressEvent};
use crate::extract::{PageExtractor, PageRecord};
use crate::fetch::Fetcher;
use crate::policy::PolicyGate;
use crate::state::{ClaimOutcome, VisitedSet};
use crate::url::normalize_url;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How long a worker waits on an empty frontier before re-checking for
/// quiescence or cancellation
const POP_TIMEOUT: Duration = Duration::from_millis(250);

/// Shared handles a worker needs to process targets
pub(crate) struct WorkerContext {
    pub max_pages: usize,
    pub max_depth: u32,
    pub frontier: Arc<Frontier>,
    pub visited: Arc<VisitedSet>,
    pub gate: Arc<PolicyGate>,
    pub fetcher: Arc<Fetcher>,
    pub extractor: Arc<dyn PageExtractor>,
    pub records: Arc<Mutex<Vec<PageRecord>>>,
    pub failed_targets: Arc<AtomicUsize>,
    /// First fetch failure of the depth-0 seed, promoted to a run error
    pub seed_failure: Arc<Mutex<Option<String>>>,
    pub progress: ProgressBus,
    pub cancel: CancellationToken,
}

/// Runs one worker until cancellation or quiescence
pub(crate) async fn run_worker(id: u32, ctx: Arc<WorkerContext>) {
    tracing::debug!("worker {} started", id);

    loop {
        let target = tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            target = ctx.frontier.pop(POP_TIMEOUT) => target,
        };

        match target {
            Some(target) => {
                process_target(id, &ctx, target).await;
                ctx.frontier.task_done();
            }
            None => {
                if ctx.frontier.is_quiescent() || ctx.cancel.is_cancelled() {
                    break;
                }
                // Timed out while other workers are mid-task; they may still
                // enqueue more work.
            }
        }
    }

    tracing::debug!("worker {} stopped", id);
}

async fn process_target(id: u32, ctx: &WorkerContext, target: CrawlTarget) {
    let address = target.address.as_str();

    // Observe a stop request before claiming: a claim is never rolled back,
    // and an address claimed but not processed would be skipped by every
    // future run once the visited set is persisted.
    if ctx.cancel.is_cancelled() {
        return;
    }

    // The authoritative uniqueness and admission check. Push-time filtering
    // is advisory; two workers may race the same address to this point and
    // exactly one proceeds. The claim is never rolled back, so a target
    // that fails below stays consumed for the rest of the run.
    match ctx.visited.try_claim_within(address, ctx.max_pages) {
        ClaimOutcome::Claimed => {}
        ClaimOutcome::AlreadyVisited => {
            tracing::trace!("worker {}: {} already claimed", id, address);
            return;
        }
        ClaimOutcome::CeilingReached => {
            // Stop claiming new work; in-flight fetches on other workers
            // run to completion and the queue drains as no-ops.
            tracing::debug!("worker {}: page ceiling reached, dropping {}", id, address);
            return;
        }
    }

    if !ctx.gate.allowed(&target.address).await {
        ctx.progress.publish(ProgressEvent::PolicyBlocked {
            address: address.to_string(),
        });
        return;
    }

    ctx.progress.publish(ProgressEvent::Fetching {
        address: address.to_string(),
        depth: target.depth,
    });

    let body = match ctx.fetcher.fetch(&target.address).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!("worker {}: {}", id, e);
            ctx.failed_targets.fetch_add(1, Ordering::Relaxed);
            if target.depth == 0 {
                let mut seed_failure = ctx.seed_failure.lock().unwrap();
                if seed_failure.is_none() {
                    *seed_failure = Some(e.to_string());
                }
            }
            ctx.progress.publish(ProgressEvent::TargetFailed {
                address: address.to_string(),
                reason: e.to_string(),
            });
            return;
        }
    };

    let record = ctx.extractor.extract(&target.address, &body);

    // Refill the frontier before the record is stored; ordering between the
    // two is unobservable, and discovered links only enqueue while depth
    // budget remains.
    if target.depth < ctx.max_depth {
        for link in &record.outbound_links {
            let Ok(address) = normalize_url(&link.url) else {
                continue;
            };
            ctx.frontier.push(CrawlTarget {
                address,
                depth: target.depth + 1,
            });
        }
    }

    let total_pages = {
        let mut records = ctx.records.lock().unwrap();
        records.push(record);
        records.len()
    };

    ctx.progress.publish(ProgressEvent::PageCompleted {
        address: address.to_string(),
        total_pages,
    });
}
