//! Batch counters and the end-of-batch report.
//!
//! [`BatchMetrics`] is shared by the producer and every worker while a batch runs.
//! Counters are relaxed atomics and are only read after all tasks have been joined.
//!
//! Once a batch finishes, the runner freezes the counters into a [`BatchReport`], which
//! can be printed or saved to a JSON file.
//!
//! ```no_run
//! use carrier_enrich::{enrich_table, EnrichConfig, InMemoryStore};
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = InMemoryStore::new();
//! let out = enrich_table(b"phone\n13000012222\n", &store, &EnrichConfig::default())?;
//! out.report.print();
//! out.report.save_to_file("metrics.json")?;
//! # Ok(())
//! # }
//! ```

use crate::enrich::LookupOutcome;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Live counters for one batch.
#[derive(Debug, Default)]
pub struct BatchMetrics {
    rows_read: AtomicU64,
    rows_skipped: AtomicU64,
    rows_matched: AtomicU64,
    rows_unmatched: AtomicU64,
    short_subjects: AtomicU64,
    empty_rows: AtomicU64,
}

impl BatchMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the decoder's final tallies.
    pub fn record_decoded(&self, read: u64, skipped: u64) {
        self.rows_read.fetch_add(read, Ordering::Relaxed);
        self.rows_skipped.fetch_add(skipped, Ordering::Relaxed);
    }

    /// Record one enriched row.
    pub fn record_outcome(&self, outcome: LookupOutcome) {
        let counter = match outcome {
            LookupOutcome::Matched => &self.rows_matched,
            LookupOutcome::Unmatched => &self.rows_unmatched,
            LookupOutcome::ShortSubject => &self.short_subjects,
            LookupOutcome::Empty => &self.empty_rows,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Freeze the counters.
    #[must_use]
    pub fn report(&self, workers: usize, peak_pending: usize, elapsed: Duration) -> BatchReport {
        BatchReport {
            rows_read: self.rows_read.load(Ordering::Relaxed),
            rows_skipped: self.rows_skipped.load(Ordering::Relaxed),
            rows_matched: self.rows_matched.load(Ordering::Relaxed),
            rows_unmatched: self.rows_unmatched.load(Ordering::Relaxed),
            short_subjects: self.short_subjects.load(Ordering::Relaxed),
            empty_rows: self.empty_rows.load(Ordering::Relaxed),
            peak_pending,
            workers,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Final statistics for one batch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Data rows that received a position (header excluded).
    pub rows_read: u64,
    /// Data rows dropped because they could not be tokenized.
    pub rows_skipped: u64,
    pub rows_matched: u64,
    pub rows_unmatched: u64,
    /// Rows whose subject was shorter than the lookup key.
    pub short_subjects: u64,
    pub empty_rows: u64,
    /// Largest number of results the reassembler held out of order.
    pub peak_pending: usize,
    pub workers: usize,
    pub elapsed_ms: u64,
}

impl BatchReport {
    /// Rows written to the output table.
    #[must_use]
    pub fn rows_written(&self) -> u64 {
        self.rows_matched + self.rows_unmatched + self.short_subjects + self.empty_rows
    }

    /// Print a human-readable summary to stdout.
    pub fn print(&self) {
        println!("\n========== Batch Metrics ==========");
        println!("Execution Time: {} ms", self.elapsed_ms);
        println!("Workers: {}", self.workers);
        println!("-----------------------------------");
        println!("rows_read: {}", self.rows_read);
        println!("rows_skipped: {}", self.rows_skipped);
        println!("rows_matched: {}", self.rows_matched);
        println!("rows_unmatched: {}", self.rows_unmatched);
        println!("short_subjects: {}", self.short_subjects);
        println!("empty_rows: {}", self.empty_rows);
        println!("peak_pending: {}", self.peak_pending);
        println!("===================================\n");
    }

    /// Save the report as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        let formatted = serde_json::to_string_pretty(self)?;
        file.write_all(formatted.as_bytes())?;
        Ok(())
    }
}
