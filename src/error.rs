//! Error taxonomy for enrichment batches.
//!
//! A batch either produces one complete output table or one terminal [`EnrichError`].
//! Row-level problems (an untokenizable line, a short or unknown lookup key) are not
//! errors at all: they are recovered where they happen and only show up in the
//! [`BatchReport`](crate::metrics::BatchReport) counters.

use thiserror::Error;

/// Terminal error for one enrichment batch.
#[derive(Error, Debug)]
pub enum EnrichError {
    /// The reference snapshot could not be loaded; no row was processed.
    #[error("reference load failed: {0}")]
    Storage(#[from] StorageError),

    /// The input could not be decoded or the output could not be encoded.
    #[error("table format error: {0}")]
    Format(#[from] FormatError),

    /// The batch configuration is unusable.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The batch was cancelled through its [`CancelToken`](crate::runner::CancelToken).
    #[error("batch cancelled")]
    Cancelled,

    /// A producer, supervisor or worker thread panicked.
    #[error("{0} thread panicked")]
    WorkerPanicked(&'static str),

    /// The ordering reassembler finished in an impossible state. This is a defect in
    /// the pipeline, never a property of the input.
    #[error("internal invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),
}

/// Failures of the reference collaborator.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backing store is missing or cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The backing store failed while reading.
    #[error("store read failed: {0:#}")]
    Backend(#[source] anyhow::Error),
}

/// Structural failures of the tabular format.
#[derive(Error, Debug)]
pub enum FormatError {
    /// The input has no header line at all.
    #[error("input has no header row")]
    MissingHeader,

    /// The header line exists but cannot be tokenized.
    #[error("unreadable header row: {0}")]
    Header(#[source] csv::Error),

    /// The underlying reader failed part-way through the data rows.
    #[error("read failed after {rows} data rows: {source}")]
    Read {
        rows: u64,
        #[source]
        source: csv::Error,
    },

    /// A row could not be written to the output table.
    #[error("encode failed at output row {row}: {source}")]
    Encode {
        row: u64,
        #[source]
        source: csv::Error,
    },

    /// Flushing the finished output failed.
    #[error("flush failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid configuration values.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("delimiter {0:?} is not a single-byte ASCII character")]
    Delimiter(char),

    #[error("header label `{0}` must not be empty")]
    EmptyLabel(&'static str),

    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Reassembler end states that can only come from a pipeline bug.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("position {position} arrived after the cursor passed it (next expected {next_expected})")]
    Stale { position: u64, next_expected: u64 },

    #[error("position {0} arrived twice")]
    Duplicate(u64),

    #[error("{pending} results still pending at completion (next expected {next_expected})")]
    PendingNotEmpty { pending: usize, next_expected: u64 },

    #[error("emitted {emitted} rows but the decoder produced {produced}")]
    CountMismatch { emitted: u64, produced: u64 },
}
