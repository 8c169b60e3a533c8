//! Frontier: the shared work queue of (address, depth) pairs
//!
//! Multi-producer multi-consumer. Ordering is FIFO, which gives the crawl
//! its breadth-first shape, but ordering is policy rather than correctness:
//! the only hard invariant is the visited set's at-most-once claim.
//!
//! Termination is quiescence-based. The frontier tracks an outstanding-work
//! counter covering both queued and in-flight items; when it reaches zero
//! there is no queued work and no worker that could produce more, so the
//! run is over. No shutdown sentinels are enqueued.

use crate::state::VisitedSet;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use url::Url;

/// A unit of crawl work: one address and its distance from the seed
#[derive(Debug, Clone)]
pub struct CrawlTarget {
    pub address: Url,
    pub depth: u32,
}

/// Thread-safe work queue with dedup-on-enqueue and quiescence detection
pub struct Frontier {
    queue: Mutex<VecDeque<CrawlTarget>>,
    /// Queued plus in-flight items; zero means quiescent
    outstanding: AtomicUsize,
    notify: Notify,
    visited: Arc<VisitedSet>,
}

impl Frontier {
    pub fn new(visited: Arc<VisitedSet>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            outstanding: AtomicUsize::new(0),
            notify: Notify::new(),
            visited,
        }
    }

    /// Enqueues a target unless its address is already visited
    ///
    /// The visited check here is a best-effort pre-filter that keeps
    /// repeatedly rediscovered links from growing the queue without bound.
    /// It is not the uniqueness guarantee: a concurrent push/claim race can
    /// still double-enqueue an address, which the claim at pop time absorbs.
    ///
    /// Returns whether the target was enqueued.
    pub fn push(&self, target: CrawlTarget) -> bool {
        if self.visited.contains(target.address.as_str()) {
            return false;
        }

        self.outstanding.fetch_add(1, Ordering::SeqCst);
        self.queue.lock().unwrap().push_back(target);
        self.notify.notify_one();
        true
    }

    /// Dequeues the next target, waiting up to `timeout` for one to appear
    ///
    /// Returns None when the timeout expires or the frontier has gone
    /// quiescent. A None return does not by itself mean the crawl is over;
    /// callers check [`Frontier::is_quiescent`].
    pub async fn pop(&self, timeout: Duration) -> Option<CrawlTarget> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if let Some(target) = self.queue.lock().unwrap().pop_front() {
                return Some(target);
            }

            if self.is_quiescent() {
                return None;
            }

            let notified = self.notify.notified();
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return None;
            }
        }
    }

    /// Marks one dequeued target as fully processed
    ///
    /// Must be called exactly once per successful `pop`, after the worker
    /// has finished enqueuing any discovered links, so the outstanding count
    /// never reaches zero while more work could still be produced.
    pub fn task_done(&self) {
        if self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
        }
    }

    /// True when no work is queued and no worker is mid-task
    pub fn is_quiescent(&self) -> bool {
        self.outstanding.load(Ordering::SeqCst) == 0
    }

    pub fn queued(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Blocks until the frontier is quiescent
    ///
    /// Re-checks on a short interval as well as on notifications, so a
    /// missed wakeup can only delay detection, never hang it.
    pub async fn wait_quiescent(&self) {
        loop {
            if self.is_quiescent() {
                return;
            }
            let notified = self.notify.notified();
            let _ = tokio::time::timeout(Duration::from_millis(100), notified).await;
        }
    }
}
