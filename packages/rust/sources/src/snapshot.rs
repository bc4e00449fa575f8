//! Local JSON datasets: primary snapshots and the override dataset.

use std::path::Path;

use poolset_shared::{PoolsetError, RawRecord, Result};
use serde_json::Value;
use tracing::{info, warn};

/// Read a JSON array of records from disk.
///
/// Non-object array entries are skipped with a warning.
pub fn load_records(path: &Path) -> Result<Vec<RawRecord>> {
    let content = std::fs::read_to_string(path).map_err(|e| PoolsetError::io(path, e))?;
    let records = parse_records(&content, path)?;
    info!(path = %path.display(), records = records.len(), "dataset loaded");
    Ok(records)
}

/// Read the authoritative override dataset.
///
/// A missing file is reported as [`PoolsetError::OverridesNotFound`].
pub fn load_overrides(path: &Path) -> Result<Vec<RawRecord>> {
    if !path.exists() {
        return Err(PoolsetError::OverridesNotFound {
            path: path.to_path_buf(),
        });
    }
    load_records(path)
}

fn parse_records(content: &str, path: &Path) -> Result<Vec<RawRecord>> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| PoolsetError::parse(format!("{}: {e}", path.display())))?;

    let Value::Array(items) = value else {
        return Err(PoolsetError::validation(format!(
            "{}: expected a JSON array of records",
            path.display()
        )));
    };

    let total = items.len();
    let records: Vec<RawRecord> = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(RawRecord::from(map)),
            _ => None,
        })
        .collect();

    if records.len() < total {
        warn!(
            path = %path.display(),
            skipped = total - records.len(),
            "dataset contained non-object entries"
        );
    }

    Ok(records)
}
