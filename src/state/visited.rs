//! Visited set with persistent cache
//!
//! The visited set is the system's central correctness primitive: every
//! other liveness and termination guarantee depends on `try_claim` granting
//! each address to exactly one worker. The set survives restarts through a
//! JSON cache file, giving at-most-once processing across runs.

use chrono::{DateTime, Utc};
use dashmap::DashSet;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;

/// Result of a ceiling-aware claim attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The caller owns this address and must process it
    Claimed,
    /// Another caller already claimed the address
    AlreadyVisited,
    /// The page ceiling is reached; no further claims are granted
    CeilingReached,
}

/// On-disk shape of the visited-set cache
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheFile {
    crawled_addresses: Vec<String>,
    timestamp: DateTime<Utc>,
}

/// Concurrent set of claimed addresses
///
/// Claiming is a compare-and-insert on a concurrent set, so the at-most-once
/// invariant holds structurally rather than through lock discipline at each
/// call site.
#[derive(Debug, Default)]
pub struct VisitedSet {
    addresses: DashSet<String>,
    /// Serializes ceiling-aware admissions; size check and insert must be
    /// one atomic step or concurrent workers can over-admit near the ceiling
    admission: Mutex<()>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically tests membership and inserts if absent
    ///
    /// Returns true only to the single caller that claims a fresh address;
    /// every concurrent caller for the same address sees false and must not
    /// process it. Claims are never rolled back: an address that failed
    /// terminally stays claimed for the rest of the run.
    pub fn try_claim(&self, address: &str) -> bool {
        self.addresses.insert(address.to_string())
    }

    /// Claims an address only while the set is below `ceiling`
    ///
    /// This is the worker-facing admission path: the size check and the
    /// insert happen under one short lock so the ceiling can never be
    /// over-admitted by concurrent claimers. Addresses merged from the
    /// persisted cache count toward the ceiling, so a resumed run picks up
    /// where the previous one left off.
    pub fn try_claim_within(&self, address: &str, ceiling: usize) -> ClaimOutcome {
        let _guard = self.admission.lock().unwrap();

        if self.addresses.len() >= ceiling {
            return ClaimOutcome::CeilingReached;
        }
        if self.addresses.insert(address.to_string()) {
            ClaimOutcome::Claimed
        } else {
            ClaimOutcome::AlreadyVisited
        }
    }

    /// Membership check without claiming
    ///
    /// Used by the frontier's push-time pre-filter; best-effort only, the
    /// claim at pop time is authoritative.
    pub fn contains(&self, address: &str) -> bool {
        self.addresses.contains(address)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Merges persisted addresses into the in-memory set
    ///
    /// A missing or corrupt cache file is not an error: the crawl starts
    /// from whatever is already in memory, with a logged warning. Returns
    /// the number of addresses merged.
    pub fn load_from(&self, path: &Path) -> usize {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                if path.exists() {
                    tracing::warn!("failed to read visited cache {}: {}", path.display(), e);
                } else {
                    tracing::debug!("no visited cache at {}, starting empty", path.display());
                }
                return 0;
            }
        };

        let cache: CacheFile = match serde_json::from_str(&content) {
            Ok(cache) => cache,
            Err(e) => {
                tracing::warn!(
                    "corrupt visited cache {}: {}; starting empty",
                    path.display(),
                    e
                );
                return 0;
            }
        };

        let mut merged = 0;
        for address in cache.crawled_addresses {
            if self.addresses.insert(address) {
                merged += 1;
            }
        }

        tracing::info!(
            "merged {} addresses from visited cache (written {})",
            merged,
            cache.timestamp
        );
        merged
    }

    /// Serializes the full set plus a timestamp to the cache file
    ///
    /// Invoked at normal completion and on cancellation so the next run does
    /// not reprocess this run's pages.
    pub fn persist_to(&self, path: &Path) -> std::io::Result<()> {
        let mut crawled_addresses: Vec<String> =
            self.addresses.iter().map(|a| a.clone()).collect();
        crawled_addresses.sort();

        let cache = CacheFile {
            crawled_addresses,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string_pretty(&cache)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)?;

        tracing::info!(
            "persisted {} addresses to visited cache {}",
            self.addresses.len(),
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_claim_succeeds_once() {
        let set = VisitedSet::new();
        assert!(set.try_claim("https://example.com/a"));
        assert!(!set.try_claim("https://example.com/a"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_distinct_addresses_claim_independently() {
        let set = VisitedSet::new();
        assert!(set.try_claim("https://example.com/a"));
        assert!(set.try_claim("https://example.com/b"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_contains_does_not_claim() {
        let set = VisitedSet::new();
        assert!(!set.contains("https://example.com/a"));
        assert!(set.try_claim("https://example.com/a"));
        assert!(set.contains("https://example.com/a"));
    }

    #[test]
    fn test_concurrent_claim_race_single_winner() {
        let set = Arc::new(VisitedSet::new());
        let mut handles = Vec::new();

        for _ in 0..16 {
            let set = set.clone();
            handles.push(std::thread::spawn(move || {
                set.try_claim("https://example.com/contested")
            }));
        }

        let wins: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();

        assert_eq!(wins, 1);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_claim_within_ceiling() {
        let set = VisitedSet::new();
        assert_eq!(
            set.try_claim_within("https://example.com/a", 2),
            ClaimOutcome::Claimed
        );
        assert_eq!(
            set.try_claim_within("https://example.com/a", 2),
            ClaimOutcome::AlreadyVisited
        );
        assert_eq!(
            set.try_claim_within("https://example.com/b", 2),
            ClaimOutcome::Claimed
        );
        assert_eq!(
            set.try_claim_within("https://example.com/c", 2),
            ClaimOutcome::CeilingReached
        );
    }

    #[test]
    fn test_ceiling_never_over_admitted_concurrently() {
        let set = Arc::new(VisitedSet::new());
        let ceiling = 5;
        let mut handles = Vec::new();

        for i in 0..32 {
            let set = set.clone();
            handles.push(std::thread::spawn(move || {
                set.try_claim_within(&format!("https://example.com/p{}", i), ceiling)
            }));
        }

        let claimed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|o| *o == ClaimOutcome::Claimed)
            .count();

        assert_eq!(claimed, ceiling);
        assert_eq!(set.len(), ceiling);
    }

    #[test]
    fn test_persist_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let set = VisitedSet::new();
        set.try_claim("https://example.com/a");
        set.try_claim("https://example.com/b");
        set.persist_to(&path).unwrap();

        let restored = VisitedSet::new();
        assert_eq!(restored.load_from(&path), 2);
        assert!(restored.contains("https://example.com/a"));
        assert!(restored.contains("https://example.com/b"));
    }

    #[test]
    fn test_load_merges_instead_of_overwriting() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let persisted = VisitedSet::new();
        persisted.try_claim("https://example.com/old");
        persisted.persist_to(&path).unwrap();

        let set = VisitedSet::new();
        set.try_claim("https://example.com/new");
        set.load_from(&path);

        assert_eq!(set.len(), 2);
        assert!(set.contains("https://example.com/old"));
        assert!(set.contains("https://example.com/new"));
    }

    #[test]
    fn test_load_missing_file_is_nonfatal() {
        let set = VisitedSet::new();
        assert_eq!(set.load_from(Path::new("/nonexistent/cache.json")), 0);
        assert!(set.is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_nonfatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{ not json").unwrap();

        let set = VisitedSet::new();
        assert_eq!(set.load_from(&path), 0);
        assert!(set.is_empty());
    }

    #[test]
    fn test_cache_file_shape() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let set = VisitedSet::new();
        set.try_claim("https://example.com/a");
        set.persist_to(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw["crawledAddresses"].is_array());
        assert!(raw["timestamp"].is_string());
    }
}
