//! Batch execution: decoder → worker pool → reassembler → encoder.
//!
//! In [`ExecMode::Parallel`] one batch runs as:
//! - a **producer** (scoped thread) decoding rows and feeding a bounded row queue,
//! - **N workers** on a dedicated rayon pool, each dequeuing rows, enriching them and
//!   sending position-tagged results to a bounded result queue,
//! - a **supervisor** (scoped thread) that waits for every worker to exit and only then
//!   releases the last handle on the result queue, closing it,
//! - the **reassembler**, on the calling thread, restoring position order while the
//!   workers are still running.
//!
//! The encoder runs on the calling thread once the reassembler has drained. Both queues
//! block their senders when full, so an arbitrarily long input never races ahead of the
//! workers by more than the queue capacities.
//!
//! [`ExecMode::Sequential`] decodes, enriches and encodes on the calling thread and is
//! byte-for-byte equivalent.

use crate::config::EnrichConfig;
use crate::enrich::{output_header, Enricher, InputRow, OutputRow};
use crate::error::{ConfigError, EnrichError, FormatError};
use crate::io::csv::{encode, DecodeOptions, TableDecoder};
use crate::metrics::{BatchMetrics, BatchReport};
use crate::reassembler::Reassembler;
use crate::reference::ReferenceSnapshot;
use crossbeam_channel::{bounded, Receiver, Sender};
use rayon::ThreadPool;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecMode {
    Sequential,
    Parallel { workers: usize },
}

/// Cooperative cancellation flag shared between a caller and a running batch.
///
/// Cancelling stops the producer from feeding new rows and makes workers exit after
/// their current row. The batch then fails with [`EnrichError::Cancelled`], unless every
/// row had already been emitted, in which case the complete output is returned.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// The complete result of one batch.
#[derive(Clone, Debug)]
pub struct EnrichOutput {
    /// The encoded output table, header included.
    pub bytes: Vec<u8>,
    pub report: BatchReport,
}

/// Runs enrichment batches with a fixed configuration.
///
/// A parallel runner owns its worker pool and can be reused for any number of batches;
/// each call to [`run`](Self::run) is independent.
pub struct Runner {
    mode: ExecMode,
    config: EnrichConfig,
    cancel: CancelToken,
    pool: Option<ThreadPool>,
}

impl Runner {
    /// Build a parallel runner with `config.worker_count()` workers.
    ///
    /// # Errors
    /// Returns [`EnrichError::Config`] for an invalid configuration or if the worker pool
    /// cannot be started.
    pub fn new(config: EnrichConfig) -> Result<Self, EnrichError> {
        config.validate()?;
        let workers = config.worker_count();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("enrich-worker-{i}"))
            .build()
            .map_err(ConfigError::from)?;
        Ok(Self {
            mode: ExecMode::Parallel { workers },
            config,
            cancel: CancelToken::new(),
            pool: Some(pool),
        })
    }

    /// Build a single-threaded runner.
    ///
    /// # Errors
    /// Returns [`EnrichError::Config`] for an invalid configuration.
    pub fn sequential(config: EnrichConfig) -> Result<Self, EnrichError> {
        config.validate()?;
        Ok(Self {
            mode: ExecMode::Sequential,
            config,
            cancel: CancelToken::new(),
            pool: None,
        })
    }

    /// Use `token` to cancel batches run by this runner.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    #[must_use]
    pub fn mode(&self) -> ExecMode {
        self.mode
    }

    #[must_use]
    pub fn config(&self) -> &EnrichConfig {
        &self.config
    }

    /// Enrich one complete table against `snapshot`.
    ///
    /// # Errors
    /// - [`EnrichError::Format`] if the header is unreadable, the reader fails, or the
    ///   output cannot be encoded
    /// - [`EnrichError::Cancelled`] if the cancel token fired
    /// - [`EnrichError::WorkerPanicked`] / [`EnrichError::Invariant`] on internal defects
    pub fn run(
        &self,
        input: &[u8],
        snapshot: &ReferenceSnapshot,
    ) -> Result<EnrichOutput, EnrichError> {
        let start = Instant::now();
        if self.cancel.is_cancelled() {
            return Err(EnrichError::Cancelled);
        }
        let delimiter = self.config.delimiter_byte()?;
        let decoder = TableDecoder::new(
            input,
            DecodeOptions {
                delimiter,
                strict_columns: self.config.strict_columns,
            },
        )?;
        let header = output_header(decoder.header(), &self.config.labels, self.config.layout);
        let enricher = Enricher::new(snapshot, self.config.key_length, self.config.layout);
        let metrics = BatchMetrics::new();

        let workers = match self.mode {
            ExecMode::Sequential => 1,
            ExecMode::Parallel { workers } => workers,
        };
        info!(
            workers,
            reference_entries = snapshot.len(),
            input_bytes = input.len(),
            "starting enrichment batch"
        );

        let (rows, peak_pending) = match &self.pool {
            None => (self.run_sequential(decoder, enricher, &metrics)?, 0),
            Some(pool) => self.run_parallel(pool, decoder, enricher, &metrics)?,
        };

        let bytes = encode(&header, &rows, delimiter)?;
        let report = metrics.report(workers, peak_pending, start.elapsed());
        info!(
            rows_read = report.rows_read,
            rows_skipped = report.rows_skipped,
            rows_matched = report.rows_matched,
            peak_pending = report.peak_pending,
            elapsed_ms = report.elapsed_ms,
            "enrichment batch complete"
        );
        Ok(EnrichOutput { bytes, report })
    }

    fn run_sequential<R: Read>(
        &self,
        mut decoder: TableDecoder<R>,
        enricher: Enricher<'_>,
        metrics: &BatchMetrics,
    ) -> Result<Vec<OutputRow>, EnrichError> {
        let mut rows = Vec::new();
        for row in decoder.by_ref() {
            if self.cancel.is_cancelled() {
                warn!("enrichment batch cancelled");
                return Err(EnrichError::Cancelled);
            }
            let (out, outcome) = enricher.enrich(row?);
            metrics.record_outcome(outcome);
            rows.push(out);
        }
        metrics.record_decoded(decoder.rows_read(), decoder.rows_skipped());
        Ok(rows)
    }

    fn run_parallel<R: Read + Send>(
        &self,
        pool: &ThreadPool,
        decoder: TableDecoder<R>,
        enricher: Enricher<'_>,
        metrics: &BatchMetrics,
    ) -> Result<(Vec<OutputRow>, usize), EnrichError> {
        let workers = pool.current_num_threads();
        let cancel = &self.cancel;
        let (row_tx, row_rx) = bounded::<InputRow>(self.config.queue_capacity);
        let (result_tx, result_rx) = bounded::<OutputRow>(self.config.result_capacity);

        thread::scope(|s| -> Result<(Vec<OutputRow>, usize), EnrichError> {
            let producer = s.spawn(move || feed(decoder, &row_tx, cancel));

            let supervisor = s.spawn(move || {
                pool.scope(|ps| {
                    for _ in 0..workers {
                        let rows = row_rx.clone();
                        let results = result_tx.clone();
                        ps.spawn(move |_| work(enricher, &rows, &results, metrics, cancel));
                    }
                });
                // Every worker has exited; dropping the last sender closes the result queue.
                drop(result_tx);
                drop(row_rx);
            });

            let mut reassembler = Reassembler::new();
            let mut ordered = Vec::new();
            let mut violation = None;
            for row in &result_rx {
                if violation.is_some() {
                    continue;
                }
                let position = row.position;
                if let Err(v) = reassembler.push(position, row, |r| ordered.push(r)) {
                    violation = Some(v);
                }
            }

            let supervised = supervisor.join();
            let produced = producer.join();
            if supervised.is_err() {
                return Err(EnrichError::WorkerPanicked("worker"));
            }
            let (read, skipped) = produced.map_err(|_| EnrichError::WorkerPanicked("producer"))??;
            metrics.record_decoded(read, skipped);

            check_cancelled(cancel, reassembler.next_expected(), read)?;
            if let Some(v) = violation {
                return Err(v.into());
            }
            let peak = reassembler.peak_pending();
            reassembler.finish(read)?;
            Ok((ordered, peak))
        })
    }
}

/// A cancelled batch fails only if rows were lost to the cancellation; a token that
/// fires after the last row was emitted leaves the complete result intact.
fn check_cancelled(cancel: &CancelToken, emitted: u64, read: u64) -> Result<(), EnrichError> {
    if emitted < read && cancel.is_cancelled() {
        warn!(emitted, read, "enrichment batch cancelled");
        return Err(EnrichError::Cancelled);
    }
    Ok(())
}

/// Producer: decode rows into the row queue until EOF, cancellation, or a reader
/// failure. Returns the decoder's `(read, skipped)` tallies.
fn feed<R: Read>(
    mut decoder: TableDecoder<R>,
    rows: &Sender<InputRow>,
    cancel: &CancelToken,
) -> Result<(u64, u64), FormatError> {
    for row in decoder.by_ref() {
        if cancel.is_cancelled() {
            break;
        }
        // A closed queue means every worker is gone; the supervisor reports why.
        if rows.send(row?).is_err() {
            break;
        }
    }
    Ok((decoder.rows_read(), decoder.rows_skipped()))
}

/// Worker: enrich rows until the row queue closes or the batch is cancelled.
fn work(
    enricher: Enricher<'_>,
    rows: &Receiver<InputRow>,
    results: &Sender<OutputRow>,
    metrics: &BatchMetrics,
    cancel: &CancelToken,
) {
    for row in rows {
        if cancel.is_cancelled() {
            break;
        }
        let (out, outcome) = enricher.enrich(row);
        metrics.record_outcome(outcome);
        if results.send(out).is_err() {
            break;
        }
    }
}
