//! Row enrichment: the pure per-row function run by every worker.

use crate::config::{ColumnLayout, HeaderLabels, DEFAULT_KEY_LENGTH};
use crate::reference::ReferenceSnapshot;

/// A decoded data row tagged with its 0-based position among data rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputRow {
    pub position: u64,
    pub fields: Vec<String>,
}

/// An enriched row: `[subject, province, city, carrier, rest...]`, still tagged with
/// the position of the input row it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputRow {
    pub position: u64,
    pub fields: Vec<String>,
}

/// What happened to a row's lookup. Feeds the batch counters only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupOutcome {
    Matched,
    Unmatched,
    /// Subject shorter than the key length; lookup skipped.
    ShortSubject,
    /// Row had no fields and passed through unchanged.
    Empty,
}

/// The first `key_length` characters of `subject`, or `None` if it is shorter.
///
/// Characters, not bytes: a multi-byte subject is never split mid-character.
#[must_use]
pub fn lookup_key(subject: &str, key_length: usize) -> Option<&str> {
    match subject.char_indices().nth(key_length) {
        Some((end, _)) => Some(&subject[..end]),
        None if subject.chars().count() == key_length => Some(subject),
        None => None,
    }
}

/// Output header: the four labels followed by the carried-over input header fields.
#[must_use]
pub fn output_header(input: &[String], labels: &HeaderLabels, layout: ColumnLayout) -> Vec<String> {
    let mut header = labels.to_vec();
    header.extend(input.iter().skip(layout.rest_start()).cloned());
    header
}

/// Per-batch enrichment rules bound to a snapshot.
///
/// `Enricher` is `Copy` and `Sync`; each worker holds one and calls
/// [`enrich`](Self::enrich) for every row it dequeues.
#[derive(Clone, Copy, Debug)]
pub struct Enricher<'a> {
    snapshot: &'a ReferenceSnapshot,
    key_length: usize,
    layout: ColumnLayout,
}

impl<'a> Enricher<'a> {
    #[must_use]
    pub fn new(snapshot: &'a ReferenceSnapshot, key_length: usize, layout: ColumnLayout) -> Self {
        Self {
            snapshot,
            key_length,
            layout,
        }
    }

    /// Enrich one row. Never fails: unknown and short keys yield empty fields.
    #[must_use]
    pub fn enrich(&self, row: InputRow) -> (OutputRow, LookupOutcome) {
        let InputRow { position, fields } = row;
        let Some(subject) = fields.first() else {
            return (OutputRow { position, fields }, LookupOutcome::Empty);
        };

        let (entry, outcome) = match lookup_key(subject, self.key_length) {
            None => (None, LookupOutcome::ShortSubject),
            Some(key) => match self.snapshot.get(key) {
                Some(e) => (Some(e), LookupOutcome::Matched),
                None => (None, LookupOutcome::Unmatched),
            },
        };

        let rest_start = self.layout.rest_start();
        let mut out = Vec::with_capacity(4 + fields.len().saturating_sub(rest_start));
        let mut it = fields.into_iter();
        out.extend(it.next());
        match entry {
            Some(e) => {
                out.push(e.province.clone());
                out.push(e.city.clone());
                out.push(e.carrier_name.clone());
            }
            None => out.extend(std::iter::repeat_n(String::new(), 3)),
        }
        out.extend(it.skip(rest_start - 1));

        (
            OutputRow {
                position,
                fields: out,
            },
            outcome,
        )
    }
}

/// Enrich with the default key length and [`ColumnLayout::Replace`].
#[must_use]
pub fn enrich(row: InputRow, snapshot: &ReferenceSnapshot) -> OutputRow {
    Enricher::new(snapshot, DEFAULT_KEY_LENGTH, ColumnLayout::Replace)
        .enrich(row)
        .0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceEntry;

    fn row(position: u64, fields: &[&str]) -> InputRow {
        InputRow {
            position,
            fields: fields.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    fn snapshot() -> ReferenceSnapshot {
        ReferenceSnapshot::from_entries(vec![ReferenceEntry::new(
            "1300001",
            "Beijing",
            "Beijing",
            "China Mobile",
        )])
    }

    #[test]
    fn key_is_character_based() {
        assert_eq!(lookup_key("13000012222", 7), Some("1300001"));
        assert_eq!(lookup_key("1300001", 7), Some("1300001"));
        assert_eq!(lookup_key("130000", 7), None);
        assert_eq!(lookup_key("电话号码一二三四", 7), Some("电话号码一二三"));
    }

    #[test]
    fn replace_layout_keeps_fields_from_index_four() {
        let snap = snapshot();
        let out = enrich(row(3, &["13000012222", "a", "b", "c", "d", "e"]), &snap);
        assert_eq!(out.position, 3);
        assert_eq!(
            out.fields,
            vec!["13000012222", "Beijing", "Beijing", "China Mobile", "d", "e"]
        );
    }

    #[test]
    fn short_row_is_not_padded() {
        let snap = snapshot();
        let out = enrich(row(0, &["12", "x"]), &snap);
        assert_eq!(out.fields, vec!["12", "", "", ""]);
    }

    #[test]
    fn insert_layout_keeps_every_original_field() {
        let snap = snapshot();
        let e = Enricher::new(&snap, 7, ColumnLayout::Insert);
        let (out, outcome) = e.enrich(row(0, &["12", "x"]));
        assert_eq!(out.fields, vec!["12", "", "", "", "x"]);
        assert_eq!(outcome, LookupOutcome::ShortSubject);
    }

    #[test]
    fn unknown_key_and_empty_row() {
        let snap = snapshot();
        let e = Enricher::new(&snap, 7, ColumnLayout::Replace);
        let (out, outcome) = e.enrich(row(1, &["19999990000"]));
        assert_eq!(out.fields, vec!["19999990000", "", "", ""]);
        assert_eq!(outcome, LookupOutcome::Unmatched);

        let (out, outcome) = e.enrich(row(2, &[]));
        assert!(out.fields.is_empty());
        assert_eq!(out.position, 2);
        assert_eq!(outcome, LookupOutcome::Empty);
    }

    #[test]
    fn header_follows_layout() {
        let input: Vec<String> = ["phone", "a", "b"].map(String::from).to_vec();
        let labels = HeaderLabels::default();
        assert_eq!(
            output_header(&input, &labels, ColumnLayout::Replace),
            vec!["phone", "province", "city", "carrier"]
        );
        assert_eq!(
            output_header(&input, &labels, ColumnLayout::Insert),
            vec!["phone", "province", "city", "carrier", "a", "b"]
        );
    }
}
