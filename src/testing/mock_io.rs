//! Reference files on temporary paths.

use crate::reference::ReferenceEntry;
use std::io::Write;
use std::path::Path;
use tempfile::TempPath;

fn temp_with(extension: &str, contents: &[u8]) -> std::io::Result<TempPath> {
    let mut file = tempfile::Builder::new()
        .suffix(&format!(".{extension}"))
        .tempfile()?;
    file.write_all(contents)?;
    file.flush()?;
    Ok(file.into_temp_path())
}

/// Write `entries` as a reference CSV. Keys listed in `deleted` get a `deleted_at`
/// timestamp. The file is removed when the returned path is dropped.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be written.
pub fn write_reference_csv(
    entries: &[ReferenceEntry],
    deleted: &[&str],
) -> std::io::Result<TempPath> {
    let mut out = String::from("key,province,city,isp,deleted_at\n");
    for e in entries {
        let deleted_at = if deleted.contains(&e.key.as_str()) {
            "2024-01-01T00:00:00Z"
        } else {
            ""
        };
        out.push_str(&format!(
            "{},{},{},{},{}\n",
            e.key, e.province, e.city, e.carrier_name, deleted_at
        ));
    }
    temp_with("csv", out.as_bytes())
}

/// Write `entries` in the segment-keyed JSON dataset shape.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be written.
pub fn write_reference_json(entries: &[ReferenceEntry]) -> std::io::Result<TempPath> {
    let map: serde_json::Map<String, serde_json::Value> = entries
        .iter()
        .map(|e| {
            (
                e.key.clone(),
                serde_json::json!({
                    "province": e.province,
                    "city": e.city,
                    "isp": e.carrier_name,
                }),
            )
        })
        .collect();
    let text = serde_json::to_vec_pretty(&map)?;
    temp_with("json", &text)
}

/// Write arbitrary bytes to a temporary file with the given extension.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be written.
pub fn write_temp(extension: &str, contents: impl AsRef<[u8]>) -> std::io::Result<TempPath> {
    temp_with(extension, contents.as_ref())
}

/// Read a file written by the CLI or a test back into bytes.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn read_bytes(path: impl AsRef<Path>) -> std::io::Result<Vec<u8>> {
    std::fs::read(path)
}
