//! Crawl-policy module
//!
//! Fetches, parses, and caches per-domain robots.txt verdicts. The gate
//! fails open: a site whose policy document cannot be obtained is treated
//! as allowing the crawl, with a logged warning.

mod gate;
mod parser;

pub use gate::{PolicyDecision, PolicyGate};
pub use parser::ParsedRobots;
