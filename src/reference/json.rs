//! JSON-file reference store, in the shape of the published segment dataset:
//!
//! ```json
//! {
//!   "1300001": { "province": "Beijing", "city": "Beijing", "isp": "China Unicom" },
//!   "1300002": { "province": "Tianjin", "city": "Tianjin", "isp": "China Unicom" }
//! }
//! ```
//!
//! An entry carrying a non-null `deleted_at` is inactive.

use super::{ReferenceEntry, ReferenceStore};
use crate::error::StorageError;
use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Deserialize)]
struct Attributes {
    #[serde(default)]
    province: String,
    #[serde(default)]
    city: String,
    #[serde(default, alias = "carrier")]
    isp: String,
    #[serde(default)]
    deleted_at: Option<String>,
}

#[derive(Clone, Debug)]
pub struct JsonReferenceStore {
    path: PathBuf,
}

impl JsonReferenceStore {
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

    fn read_entries(&self) -> anyhow::Result<Vec<ReferenceEntry>> {
        let f = File::open(&self.path).with_context(|| format!("open {}", self.path.display()))?;
        let raw: BTreeMap<String, Attributes> = serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse {}", self.path.display()))?;
        Ok(raw
            .into_iter()
            .filter(|(_, a)| a.deleted_at.is_none())
            .map(|(key, a)| ReferenceEntry {
                key,
                province: a.province,
                city: a.city,
                carrier_name: a.isp,
            })
            .collect())
    }
}

impl ReferenceStore for JsonReferenceStore {
    fn bulk_read_active_entries(&self) -> Result<Vec<ReferenceEntry>, StorageError> {
        self.read_entries().map_err(StorageError::Backend)
    }
}
