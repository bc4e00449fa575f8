//! Export surfaces: the full dataset and the stake distribution.

use std::path::{Path, PathBuf};

use poolset_shared::{PoolRecord, PoolsetError, RawRecord, Result};
use tracing::{info, instrument};

/// Result of a stake distribution export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakeExport {
    /// Path of the written CSV.
    pub path: PathBuf,
    /// Number of stake values written.
    pub count: usize,
}

/// Write the dataset as a pretty-printed JSON array.
#[instrument(skip_all, fields(path = %path.display(), records = records.len()))]
pub fn write_pools_json(path: &Path, records: &[PoolRecord]) -> Result<()> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(records)
        .map_err(|e| PoolsetError::Export(format!("failed to serialize pools: {e}")))?;
    std::fs::write(path, json).map_err(|e| PoolsetError::io(path, e))?;
    info!("dataset written");
    Ok(())
}

/// Keep only positive stake values, in order.
pub fn positive_stakes(stakes: impl IntoIterator<Item = Option<i64>>) -> Vec<i64> {
    stakes.into_iter().flatten().filter(|&s| s > 0).collect()
}

/// File name of the stake distribution, named after its row count.
pub fn stake_csv_file_name(count: usize) -> String {
    format!("synthetic-stake-distribution-{count}-agents.csv")
}

/// Write one stake value per row, without a header, into `dir`.
#[instrument(skip_all, fields(dir = %dir.display(), count = stakes.len()))]
pub fn write_stake_distribution(dir: &Path, stakes: &[i64]) -> Result<StakeExport> {
    std::fs::create_dir_all(dir).map_err(|e| PoolsetError::io(dir, e))?;
    let path = dir.join(stake_csv_file_name(stakes.len()));

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&path)
        .map_err(|e| PoolsetError::Export(format!("{}: {e}", path.display())))?;
    for stake in stakes {
        writer
            .write_record([stake.to_string()])
            .map_err(|e| PoolsetError::Export(format!("{}: {e}", path.display())))?;
    }
    writer.flush().map_err(|e| PoolsetError::io(&path, e))?;

    info!(path = %path.display(), "stake distribution written");
    Ok(StakeExport {
        path,
        count: stakes.len(),
    })
}

/// Stake distribution of an in-memory dataset, written into `dir`.
///
/// Each record contributes its stake under either name.
pub fn export_stakes(dir: &Path, records: &[PoolRecord]) -> Result<StakeExport> {
    let stakes = positive_stakes(records.iter().map(PoolRecord::stake));
    write_stake_distribution(dir, &stakes)
}

/// Stake distribution of a previously exported dataset file, written next to it.
pub fn export_stakes_from_file(json_path: &Path) -> Result<StakeExport> {
    let records = poolset_sources::load_records(json_path)?;
    let stakes = positive_stakes(records.iter().map(RawRecord::stake));
    let dir = json_path.parent().unwrap_or_else(|| Path::new(""));
    write_stake_distribution(dir, &stakes)
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| PoolsetError::io(parent, e))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poolset_shared::{Group, STAKE_ALIAS_FIELD, STAKE_FIELD};
    use serde_json::{Map, Value, json};

    fn pool(id: &str, stake: Value) -> PoolRecord {
        PoolRecord {
            id: id.into(),
            ticker: Some(id.to_uppercase()),
            group: Group::SingleOperator,
            fields: Map::from_iter([(STAKE_FIELD.to_string(), stake)]),
        }
    }

    #[test]
    fn positive_stakes_only() {
        let stakes = positive_stakes([Some(5), Some(0), None, Some(-3), Some(12)]);
        assert_eq!(stakes, vec![5, 12]);
    }

    #[test]
    fn file_name_reflects_count() {
        assert_eq!(
            stake_csv_file_name(2961),
            "synthetic-stake-distribution-2961-agents.csv"
        );
    }

    #[test]
    fn writes_dataset_and_distribution() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![
            pool("p1", json!(5)),
            pool("p2", json!(0)),
            pool("p3", json!("unparsed")),
            pool("p4", json!(40)),
        ];

        let pools_path = dir.path().join("out").join("pools.json");
        write_pools_json(&pools_path, &records).unwrap();
        let written: Vec<PoolRecord> =
            serde_json::from_str(&std::fs::read_to_string(&pools_path).unwrap()).unwrap();
        assert_eq!(written, records);

        let export = export_stakes(dir.path(), &records).unwrap();
        assert_eq!(export.count, 2);
        assert_eq!(
            export.path.file_name().and_then(|n| n.to_str()),
            Some("synthetic-stake-distribution-2-agents.csv")
        );
        assert_eq!(std::fs::read_to_string(&export.path).unwrap(), "5\n40\n");
    }

    #[test]
    fn alias_only_stakes_are_exported() {
        let dir = tempfile::tempdir().unwrap();
        let mut alias_only = pool("p1", json!(null));
        alias_only.fields.remove(STAKE_FIELD);
        alias_only
            .fields
            .insert(STAKE_ALIAS_FIELD.to_string(), json!(5));
        let records = vec![alias_only, pool("p2", json!(11))];

        let export = export_stakes(dir.path(), &records).unwrap();
        assert_eq!(export.count, 2);
        assert_eq!(std::fs::read_to_string(&export.path).unwrap(), "5\n11\n");
    }

    #[test]
    fn export_from_file_writes_next_to_it() {
        let dir = tempfile::tempdir().unwrap();
        let pools_path = dir.path().join("pools.json");
        std::fs::write(
            &pools_path,
            r#"[
                {"pool_id_bech32": "p1", "ticker": "A", "active_stake": 7, "group": "sSPO"},
                {"pool_id_bech32": "p2", "ticker": "B", "active_stake": 0, "group": "MPO"},
                {"pool_id_bech32": "p3", "ticker": "C", "group": "MPO"},
                {"pool_id_bech32": "p4", "ticker": "D", "stake": 3, "group": "sSPO"}
            ]"#,
        )
        .unwrap();

        let export = export_stakes_from_file(&pools_path).unwrap();
        assert_eq!(export.count, 2);
        assert_eq!(export.path.parent(), Some(dir.path()));
        assert_eq!(std::fs::read_to_string(&export.path).unwrap(), "7\n3\n");
    }
}
