//! CSV-file reference store.
//!
//! Expected header: `key,province,city,isp`, optionally followed by `deleted_at`.
//! Column order is taken from the header, so extra columns are ignored. A row with a
//! non-empty `deleted_at` is inactive.

use super::{ReferenceEntry, ReferenceStore};
use crate::error::StorageError;
use anyhow::{anyhow, Context};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Reference entries read from a CSV file on every bulk read.
#[derive(Clone, Debug)]
pub struct CsvReferenceStore {
    path: PathBuf,
}

impl CsvReferenceStore {
    /// Point the store at `path`. The file must exist.
    ///
    /// # Errors
    /// Returns [`StorageError::Unavailable`] if the path is not a file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(StorageError::Unavailable(format!(
                "{} is not a file",
                path.display()
            )));
        }
        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> anyhow::Result<Vec<ReferenceEntry>> {
        let f = File::open(&self.path).with_context(|| format!("open {}", self.path.display()))?;
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(f);
        let headers = rdr.headers().context("read reference header")?.clone();
        let col = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
        let key = col("key").ok_or_else(|| anyhow!("reference header has no `key` column"))?;
        let province =
            col("province").ok_or_else(|| anyhow!("reference header has no `province` column"))?;
        let city = col("city").ok_or_else(|| anyhow!("reference header has no `city` column"))?;
        let carrier = col("isp")
            .or_else(|| col("carrier"))
            .ok_or_else(|| anyhow!("reference header has no `isp` column"))?;
        let deleted_at = col("deleted_at");

        let mut out = Vec::new();
        for (i, rec) in rdr.records().enumerate() {
            let rec = rec.with_context(|| format!("parse reference record #{}", i + 1))?;
            let field = |idx: usize| rec.get(idx).unwrap_or("").to_string();
            if deleted_at.is_some_and(|idx| !rec.get(idx).unwrap_or("").trim().is_empty()) {
                continue;
            }
            out.push(ReferenceEntry {
                key: field(key),
                province: field(province),
                city: field(city),
                carrier_name: field(carrier),
            });
        }
        Ok(out)
    }
}

impl ReferenceStore for CsvReferenceStore {
    fn bulk_read_active_entries(&self) -> Result<Vec<ReferenceEntry>, StorageError> {
        self.read_entries().map_err(StorageError::Backend)
    }
}
