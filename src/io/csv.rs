//! Delimited-text table codec.
//!
//! This module provides:
//! - **Decoding** with [`TableDecoder`] (or [`decode`] for the default options): reads the
//!   header eagerly, then yields data rows lazily as position-tagged [`InputRow`]s
//! - **Encoding** with [`TableEncoder`] and the one-shot [`encode`] helper
//!
//! # Design notes
//! - Positions count data rows only (header excluded) and are assigned to rows that
//!   tokenize successfully, so they stay contiguous even when rows are skipped.
//! - A data row that cannot be tokenized (invalid UTF-8, or a field-count mismatch in
//!   strict mode) is skipped and counted. Only a failure of the underlying reader, or an
//!   unreadable header, is fatal.
//! - Rows may differ in length on both sides; the output writer is always flexible.

use crate::enrich::{InputRow, OutputRow};
use crate::error::FormatError;
use csv::{ErrorKind, ReaderBuilder, StringRecord, WriterBuilder};
use std::io::{Read, Write};
use tracing::debug;

/// Decoding options.
#[derive(Clone, Copy, Debug)]
pub struct DecodeOptions {
    pub delimiter: u8,
    /// Skip data rows whose field count differs from the header's.
    pub strict_columns: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            strict_columns: false,
        }
    }
}

/// Lazy decoder over a delimited table.
///
/// Construction reads the header. Iteration yields `Ok(InputRow)` for every row that
/// tokenizes, silently steps over rows that do not, and yields a single `Err` (then
/// stops) if the reader itself fails.
pub struct TableDecoder<R> {
    reader: csv::Reader<R>,
    header: Vec<String>,
    record: StringRecord,
    next_position: u64,
    skipped: u64,
    done: bool,
}

impl<R: Read> TableDecoder<R> {
    /// Read the header row and prepare to stream data rows.
    ///
    /// # Errors
    /// [`FormatError::MissingHeader`] for empty input, [`FormatError::Header`] if the
    /// first row cannot be tokenized.
    pub fn new(input: R, options: DecodeOptions) -> Result<Self, FormatError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .delimiter(options.delimiter)
            .flexible(!options.strict_columns)
            .from_reader(input);
        let mut record = StringRecord::new();
        if !reader.read_record(&mut record).map_err(FormatError::Header)? {
            return Err(FormatError::MissingHeader);
        }
        let header = record.iter().map(str::to_string).collect();
        Ok(Self {
            reader,
            header,
            record,
            next_position: 0,
            skipped: 0,
            done: false,
        })
    }

    #[must_use]
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Positions assigned so far, i.e. the number of rows yielded.
    #[must_use]
    pub fn rows_read(&self) -> u64 {
        self.next_position
    }

    /// Rows stepped over because they could not be tokenized.
    #[must_use]
    pub fn rows_skipped(&self) -> u64 {
        self.skipped
    }
}

impl<R: Read> Iterator for TableDecoder<R> {
    type Item = Result<InputRow, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            match self.reader.read_record(&mut self.record) {
                Ok(false) => self.done = true,
                Ok(true) => {
                    let position = self.next_position;
                    self.next_position += 1;
                    return Some(Ok(InputRow {
                        position,
                        fields: self.record.iter().map(str::to_string).collect(),
                    }));
                }
                Err(err) if is_row_level(&err) => {
                    self.skipped += 1;
                    debug!(
                        line = err.position().map(csv::Position::line),
                        error = %err,
                        "skipping malformed row"
                    );
                }
                Err(source) => {
                    self.done = true;
                    return Some(Err(FormatError::Read {
                        rows: self.next_position,
                        source,
                    }));
                }
            }
        }
        None
    }
}

fn is_row_level(err: &csv::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::Utf8 { .. } | ErrorKind::UnequalLengths { .. }
    )
}

/// Decode `input` with the default options: the header eagerly, the data rows lazily.
///
/// # Errors
/// See [`TableDecoder::new`].
pub fn decode<R: Read>(input: R) -> Result<TableDecoder<R>, FormatError> {
    TableDecoder::new(input, DecodeOptions::default())
}

/// Streaming table writer.
pub struct TableEncoder<W: Write> {
    writer: csv::Writer<W>,
    rows: u64,
}

impl<W: Write> TableEncoder<W> {
    #[must_use]
    pub fn new(output: W, delimiter: u8) -> Self {
        let writer = WriterBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_writer(output);
        Self { writer, rows: 0 }
    }

    /// Write the header row.
    ///
    /// # Errors
    /// Returns [`FormatError::Encode`] if the writer rejects the row.
    pub fn write_header(&mut self, header: &[String]) -> Result<(), FormatError> {
        self.writer
            .write_record(header)
            .map_err(|source| FormatError::Encode { row: 0, source })
    }

    /// Write one data row. Rows must arrive in their final order.
    ///
    /// # Errors
    /// Returns [`FormatError::Encode`] if the writer rejects the row.
    pub fn write_row(&mut self, row: &OutputRow) -> Result<(), FormatError> {
        self.rows += 1;
        self.writer
            .write_record(&row.fields)
            .map_err(|source| FormatError::Encode {
                row: self.rows,
                source,
            })
    }

    /// Flush and return the underlying writer.
    ///
    /// # Errors
    /// Returns [`FormatError::Io`] if the final flush fails.
    pub fn finish(self) -> Result<W, FormatError> {
        self.writer
            .into_inner()
            .map_err(|e| FormatError::Io(e.into_error()))
    }
}

/// Encode a header and already-ordered rows into a byte buffer.
///
/// # Errors
/// See [`TableEncoder`].
pub fn encode<'a>(
    header: &[String],
    rows: impl IntoIterator<Item = &'a OutputRow>,
    delimiter: u8,
) -> Result<Vec<u8>, FormatError> {
    let mut enc = TableEncoder::new(Vec::new(), delimiter);
    enc.write_header(header)?;
    for row in rows {
        enc.write_row(row)?;
    }
    enc.finish()
}
