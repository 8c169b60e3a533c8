//! Crawl state module
//!
//! Holds the visited set, the durable record of which addresses have been
//! claimed by a worker in this run or a previous one.

mod visited;

pub use visited::{ClaimOutcome, VisitedSet};
