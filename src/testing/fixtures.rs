//! Reference data and input tables for tests.

use crate::reference::{InMemoryStore, ReferenceEntry, ReferenceSnapshot};

/// A handful of segments across carriers and provinces.
#[must_use]
pub fn sample_entries() -> Vec<ReferenceEntry> {
    vec![
        ReferenceEntry::new("1300001", "Beijing", "Beijing", "China Mobile"),
        ReferenceEntry::new("1300002", "Tianjin", "Tianjin", "China Unicom"),
        ReferenceEntry::new("1380013", "Guangdong", "Shenzhen", "China Mobile"),
        ReferenceEntry::new("1530000", "Shanghai", "Shanghai", "China Telecom"),
        ReferenceEntry::new("1860755", "Guangdong", "Guangzhou", "China Unicom"),
    ]
}

/// [`sample_entries`] in an [`InMemoryStore`].
#[must_use]
pub fn sample_store() -> InMemoryStore {
    InMemoryStore::from_entries(sample_entries())
}

/// [`sample_entries`] frozen into a snapshot.
#[must_use]
pub fn sample_snapshot() -> ReferenceSnapshot {
    ReferenceSnapshot::from_entries(sample_entries())
}

/// Builds a comma-delimited input table.
///
/// Fields are quoted only when they contain a comma, quote or line break.
#[derive(Clone, Debug, Default)]
pub struct TableBuilder {
    out: Vec<u8>,
}

impl TableBuilder {
    pub fn new<I, S>(header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::default().row(header)
    }

    #[must_use]
    pub fn row<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let line: Vec<String> = fields.into_iter().map(|f| quote(f.as_ref())).collect();
        self.out.extend_from_slice(line.join(",").as_bytes());
        self.out.push(b'\n');
        self
    }

    /// Append a raw line verbatim, e.g. bytes that are not valid UTF-8.
    #[must_use]
    pub fn raw_line(mut self, line: &[u8]) -> Self {
        self.out.extend_from_slice(line);
        self.out.push(b'\n');
        self
    }

    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.out
    }
}

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// A `phone,seq,note` table of `rows` rows cycling through the sample segments, a
/// few unknown segments and a few short subjects. `seq` holds the row index.
#[must_use]
pub fn generated_table(rows: usize) -> Vec<u8> {
    let prefixes = ["1300001", "1300002", "1380013", "1530000", "1860755", "1999999"];
    let mut b = TableBuilder::new(["phone", "seq", "note"]);
    for i in 0..rows {
        let phone = if i % 17 == 0 {
            format!("{}", i % 1000)
        } else {
            format!("{}{:04}", prefixes[i % prefixes.len()], i % 10_000)
        };
        b = b.row([phone, i.to_string(), format!("note {i}")]);
    }
    b.build()
}
