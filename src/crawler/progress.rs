//! Progress event stream
//!
//! The core publishes progress as typed events on a broadcast channel;
//! whatever front end is attached (CLI, control panel) subscribes and
//! renders them. Publishing never blocks: with no subscriber, or a slow
//! one, events are simply dropped. The crawl does not share mutable status
//! state with the presentation layer.

use std::fmt;
use tokio::sync::broadcast;

/// Events emitted while a crawl runs
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// The run started with the given seed address
    Started { seed: String },

    /// A worker is about to fetch an address
    Fetching { address: String, depth: u32 },

    /// A page was fetched and recorded; `total_pages` counts records so far
    PageCompleted { address: String, total_pages: usize },

    /// An address failed terminally and will not be retried this run
    TargetFailed { address: String, reason: String },

    /// An address was blocked by the policy gate
    PolicyBlocked { address: String },

    /// The run finished
    Finished { total_pages: usize },
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started { seed } => write!(f, "starting crawl at {}", seed),
            Self::Fetching { address, depth } => {
                write!(f, "fetching {} (depth {})", address, depth)
            }
            Self::PageCompleted {
                address,
                total_pages,
            } => write!(f, "completed {} ({} pages)", address, total_pages),
            Self::TargetFailed { address, reason } => {
                write!(f, "failed {}: {}", address, reason)
            }
            Self::PolicyBlocked { address } => write!(f, "blocked by policy: {}", address),
            Self::Finished { total_pages } => write!(f, "crawl finished: {} pages", total_pages),
        }
    }
}

/// Handle for publishing and subscribing to progress events
#[derive(Clone)]
pub struct ProgressBus {
    tx: broadcast::Sender<ProgressEvent>,
}

impl ProgressBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    /// Subscribes to the event stream
    ///
    /// A subscriber that falls behind loses the oldest events; the stream is
    /// advisory, not a journal.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }

    /// Publishes an event without blocking
    pub fn publish(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new()
    }
}
