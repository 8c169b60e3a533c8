//! Run statistics
//!
//! Statistics are derived on demand from the accumulated page records,
//! never mutated directly; recomputing from the append-only store avoids
//! any locking during reporting.

use crate::extract::PageRecord;

/// Aggregate statistics for a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct RunStatistics {
    pub total_pages: usize,
    pub total_links: usize,
    pub total_images: usize,
    pub total_words: usize,
    pub average_words_per_page: f64,
    pub average_links_per_page: f64,
    pub average_images_per_page: f64,
}

impl RunStatistics {
    /// Computes statistics from a snapshot of page records
    pub fn from_records(records: &[PageRecord]) -> Self {
        let total_pages = records.len();
        let total_links: usize = records.iter().map(|r| r.outbound_links.len()).sum();
        let total_images: usize = records.iter().map(|r| r.images.len()).sum();
        let total_words: usize = records.iter().map(|r| r.word_count).sum();

        let per_page = |total: usize| {
            if total_pages > 0 {
                total as f64 / total_pages as f64
            } else {
                0.0
            }
        };

        Self {
            total_pages,
            total_links,
            total_images,
            total_words,
            average_words_per_page: per_page(total_words),
            average_links_per_page: per_page(total_links),
            average_images_per_page: per_page(total_images),
        }
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Total pages: {}", stats.total_pages);
    println!("  Total links: {}", stats.total_links);
    println!("  Total images: {}", stats.total_images);
    println!("  Total words: {}", stats.total_words);
    println!();

    println!("Per page:");
    println!("  Words: {:.1}", stats.average_words_per_page);
    println!("  Links: {:.1}", stats.average_links_per_page);
    println!("  Images: {:.1}", stats.average_images_per_page);
}
