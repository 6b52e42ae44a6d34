//! Assertions over encoded tables.

/// Decode an output table into rows of fields.
///
/// # Panics
///
/// Panics if `bytes` is not a readable table.
#[must_use]
pub fn parse_table(bytes: &[u8]) -> Vec<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    rdr.records()
        .map(|r| {
            r.expect("output table must be readable")
                .iter()
                .map(str::to_string)
                .collect()
        })
        .collect()
}

/// Assert that an encoded table equals `expected`, given as table text.
///
/// Both sides are parsed before comparing, so quoting differences do not matter.
///
/// # Panics
///
/// Panics on the first differing row, or if the row counts differ.
pub fn assert_table_eq(bytes: &[u8], expected: &str) {
    let actual = parse_table(bytes);
    let expected = parse_table(expected.as_bytes());
    for (i, (a, e)) in actual.iter().zip(&expected).enumerate() {
        assert_eq!(a, e, "Table mismatch at row {i}:\n  Expected: {e:?}\n  Actual: {a:?}");
    }
    assert_eq!(
        actual.len(),
        expected.len(),
        "Table length mismatch:\n  Expected: {expected:?}\n  Actual: {actual:?}"
    );
}

/// Assert that the values of column `column` parse as strictly increasing integers.
///
/// Used with tables whose input carried the row index in a column, to check that
/// output order matches input order.
///
/// # Panics
///
/// Panics if a value is missing, not an integer, or not greater than its predecessor.
pub fn assert_strictly_increasing(rows: &[Vec<String>], column: usize) {
    let mut prev: Option<u64> = None;
    for (i, row) in rows.iter().enumerate() {
        let value: u64 = row
            .get(column)
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| panic!("row {i} has no integer in column {column}: {row:?}"));
        if let Some(p) = prev {
            assert!(value > p, "row {i} is out of order: {value} after {p}");
        }
        prev = Some(value);
    }
}
