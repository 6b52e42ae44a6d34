//! Batch configuration.
//!
//! An [`EnrichConfig`] is built once (defaults, a JSON file, or CLI flags) and passed
//! explicitly to [`Runner::new`](crate::runner::Runner::new) or
//! [`enrich_table`](crate::enrich_table). Nothing in the crate reads configuration from
//! global state.
//!
//! ```
//! use carrier_enrich::config::{ColumnLayout, EnrichConfig};
//!
//! let cfg = EnrichConfig {
//!     workers: Some(4),
//!     layout: ColumnLayout::Insert,
//!     ..EnrichConfig::default()
//! };
//! assert!(cfg.validate().is_ok());
//! assert_eq!(cfg.worker_count(), 4);
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default capacity of both bounded queues.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Default lookup key length, in characters.
pub const DEFAULT_KEY_LENGTH: usize = 7;

/// Labels written in place of the first four output header fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderLabels {
    pub subject: String,
    pub province: String,
    pub city: String,
    pub carrier: String,
}

impl Default for HeaderLabels {
    fn default() -> Self {
        Self {
            subject: "phone".into(),
            province: "province".into(),
            city: "city".into(),
            carrier: "carrier".into(),
        }
    }
}

impl HeaderLabels {
    /// The four labels in output order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        vec![
            self.subject.clone(),
            self.province.clone(),
            self.city.clone(),
            self.carrier.clone(),
        ]
    }
}

/// Where the derived fields land relative to the original columns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnLayout {
    /// The derived fields occupy output positions 1..=3 and original fields from
    /// index 4 onward are appended. Original fields 1..=3 are dropped.
    #[default]
    Replace,
    /// The derived fields are inserted after the subject and every original field
    /// from index 1 onward is kept.
    Insert,
}

impl ColumnLayout {
    /// Index of the first original field carried over unchanged.
    #[must_use]
    pub const fn rest_start(self) -> usize {
        match self {
            Self::Replace => 4,
            Self::Insert => 1,
        }
    }
}

/// Configuration for one enrichment batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichConfig {
    /// Worker-pool size. `None` sizes the pool to the available parallelism.
    pub workers: Option<usize>,
    /// Capacity of the row-feed queue between decoder and workers.
    pub queue_capacity: usize,
    /// Capacity of the result queue between workers and reassembler.
    pub result_capacity: usize,
    /// Number of leading subject characters that form the lookup key.
    pub key_length: usize,
    pub labels: HeaderLabels,
    pub layout: ColumnLayout,
    /// Treat data rows whose field count differs from the header's as malformed.
    /// Off by default; `true` matches readers that fix the field count from the header
    /// and skip ragged rows.
    pub strict_columns: bool,
    pub delimiter: char,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            workers: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            result_capacity: DEFAULT_QUEUE_CAPACITY,
            key_length: DEFAULT_KEY_LENGTH,
            labels: HeaderLabels::default(),
            layout: ColumnLayout::default(),
            strict_columns: false,
            delimiter: ',',
        }
    }
}

impl EnrichConfig {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or if the
    /// resulting configuration fails [`validate`](Self::validate).
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let cfg: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check value invariants.
    ///
    /// # Errors
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == Some(0) {
            return Err(ConfigError::Zero { field: "workers" });
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Zero {
                field: "queue_capacity",
            });
        }
        if self.result_capacity == 0 {
            return Err(ConfigError::Zero {
                field: "result_capacity",
            });
        }
        if self.key_length == 0 {
            return Err(ConfigError::Zero { field: "key_length" });
        }
        self.delimiter_byte()?;
        for (name, label) in [
            ("subject", &self.labels.subject),
            ("province", &self.labels.province),
            ("city", &self.labels.city),
            ("carrier", &self.labels.carrier),
        ] {
            if label.is_empty() {
                return Err(ConfigError::EmptyLabel(name));
            }
        }
        Ok(())
    }

    /// Resolved worker count.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get).max(1)
    }

    /// The delimiter as the single byte the tokenizer expects.
    ///
    /// # Errors
    /// Returns [`ConfigError::Delimiter`] for non-ASCII delimiters.
    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or(ConfigError::Delimiter(self.delimiter))
    }
}
