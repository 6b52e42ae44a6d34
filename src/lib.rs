//! # carrier-enrich
//!
//! Enriches a table of phone numbers with the province, city and carrier of each
//! number's segment, looked up in a reference table loaded once per batch. Rows are
//! enriched concurrently and written back in exactly their input order, with every
//! trailing column preserved.
//!
//! ## Quick Start
//!
//! ```
//! use carrier_enrich::*;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let store = InMemoryStore::from_entries(vec![ReferenceEntry::new(
//!     "1300001",
//!     "Beijing",
//!     "Beijing",
//!     "China Mobile",
//! )]);
//!
//! let input = b"phone,a,b,c,note\n13000012222,x,y,z,kept\n";
//! let out = enrich_table(input, &store, &EnrichConfig::default())?;
//!
//! assert_eq!(
//!     String::from_utf8(out.bytes)?,
//!     "phone,province,city,carrier,note\n13000012222,Beijing,Beijing,China Mobile,kept\n"
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## How a batch runs
//!
//! 1. [`load_snapshot`] reads every active entry from a [`ReferenceStore`] once and
//!    freezes it into a [`ReferenceSnapshot`]. A storage failure ends the batch here.
//! 2. The [`TableDecoder`](io::csv::TableDecoder) reads the header, then yields data
//!    rows tagged with their position. Rows that cannot be tokenized are skipped.
//! 3. A fixed pool of workers applies [`Enricher::enrich`] to each row. The first
//!    seven characters of the first field select the reference entry; unknown or short
//!    keys produce empty fields rather than errors.
//! 4. The [`Reassembler`] puts results back in position order while workers run.
//! 5. The encoder writes the new header and the ordered rows.
//!
//! The caller gets the whole output table or a single [`EnrichError`].
//!
//! ## Execution Modes
//!
//! - [`Runner::new`] - parallel, pool sized from [`EnrichConfig::workers`] or the number of CPUs
//! - [`Runner::sequential`] - single-threaded, same output byte for byte
//!
//! ## Module Overview
//!
//! - [`reference`] - reference entries, snapshots and stores
//! - [`io`] - table decoding and encoding
//! - [`enrich`] - the per-row enrichment function
//! - [`reassembler`] - ordered merge of out-of-order results
//! - [`runner`] - batch orchestration and cancellation
//! - [`config`] - batch configuration
//! - [`metrics`] - batch counters and reports
//! - [`error`] - error taxonomy
//! - [`testing`] - fixtures and assertions for tests

pub mod config;
pub mod enrich;
pub mod error;
pub mod io;
pub mod metrics;
pub mod reassembler;
pub mod reference;
pub mod runner;
pub mod testing;

pub use config::{ColumnLayout, EnrichConfig, HeaderLabels};
pub use enrich::{enrich, lookup_key, Enricher, InputRow, LookupOutcome, OutputRow};
pub use error::{ConfigError, EnrichError, FormatError, InvariantViolation, StorageError};
pub use metrics::BatchReport;
pub use reassembler::Reassembler;
pub use reference::{
    load_snapshot, CsvReferenceStore, InMemoryStore, JsonReferenceStore, ReferenceEntry,
    ReferenceSnapshot, ReferenceStore,
};
pub use runner::{CancelToken, EnrichOutput, ExecMode, Runner};

/// Enrich one complete table: load a snapshot from `store`, then run a parallel batch.
///
/// The store is read exactly once, before any row is decoded.
///
/// # Errors
/// - [`EnrichError::Config`] if `config` is invalid
/// - [`EnrichError::Storage`] if the reference load fails
/// - anything [`Runner::run`] returns
pub fn enrich_table<S: ReferenceStore + ?Sized>(
    input: &[u8],
    store: &S,
    config: &EnrichConfig,
) -> Result<EnrichOutput, EnrichError> {
    let runner = Runner::new(config.clone())?;
    let snapshot = load_snapshot(store)?;
    runner.run(input, &snapshot)
}
