//! Ticker-level replacement of classified pools by the override dataset.
//!
//! The override dataset is authoritative: when it lists a ticker, every
//! classified pool with that ticker is discarded and the override records
//! for the ticker are appended in its place. Nothing is merged field by
//! field, so an override record missing a field the registry had simply
//! does not have it in the output.

use std::collections::HashSet;

use poolset_shared::{
    GROUP_FIELD, Group, ID_FIELD, PoolRecord, RawRecord, STAKE_ALIAS_FIELD, STAKE_FIELD,
};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::diagnostics::{Diagnostic, Diagnostics, RecordOrigin};

/// Override field holding the pool id.
pub const OVERRIDE_ID_FIELD: &str = "name";

/// Group label used by the override dataset for single-pool operators.
pub const OVERRIDE_SINGLE_POOL_LABEL: &str = "Single Pool";

/// Result of [`reconcile`].
#[derive(Debug, Clone)]
pub struct Reconciled {
    /// Surviving classified pools followed by the override pools.
    pub records: Vec<PoolRecord>,
    /// Classified pools discarded because their ticker was overridden.
    pub replaced: usize,
    /// Override pools appended.
    pub appended: usize,
}

/// Map an override record onto the output schema.
///
/// `name` becomes the pool id, `stake` becomes the canonical stake field and
/// the `"Single Pool"` label becomes sSPO. Records with no id are handed back.
pub fn prepare_override(mut raw: RawRecord) -> std::result::Result<PoolRecord, RawRecord> {
    if let Some(name) = raw.remove(OVERRIDE_ID_FIELD) {
        raw.insert(ID_FIELD, name);
    }
    if let Some(stake) = raw.remove(STAKE_ALIAS_FIELD) {
        raw.insert(STAKE_FIELD, stake);
    }
    if raw.get_str(GROUP_FIELD) == Some(OVERRIDE_SINGLE_POOL_LABEL) {
        raw.insert(GROUP_FIELD, Value::from(Group::SSPO));
    }
    PoolRecord::from_raw(raw)
}

/// Replace classified pools by override pools sharing their ticker.
///
/// Only non-null tickers take part: a classified pool without a ticker is
/// never removed, and an override pool without a ticker removes nothing.
/// Classified pools keep their relative order; override pools are appended
/// in dataset order.
#[instrument(skip_all, fields(classified = classified.len(), overrides = overrides.len()))]
pub fn reconcile(
    classified: Vec<PoolRecord>,
    overrides: Vec<RawRecord>,
    diags: &mut Diagnostics,
) -> Reconciled {
    let mut prepared = Vec::with_capacity(overrides.len());
    for raw in overrides {
        match prepare_override(raw) {
            Ok(record) => prepared.push(record),
            Err(raw) => diags.record(Diagnostic::MissingId {
                origin: RecordOrigin::Overrides,
                record: Value::Object(raw.0),
            }),
        }
    }

    let before = classified.len();
    let mut records: Vec<PoolRecord> = {
        let overridden: HashSet<&str> = prepared
            .iter()
            .filter_map(|r| r.ticker.as_deref())
            .collect();

        classified
            .into_iter()
            .filter(|r| match r.ticker.as_deref() {
                Some(ticker) if overridden.contains(ticker) => {
                    debug!(id = %r.id, ticker, "replaced by override dataset");
                    false
                }
                _ => true,
            })
            .collect()
    };
    let replaced = before - records.len();

    let appended = prepared.len();
    records.extend(prepared);

    info!(replaced, appended, total = records.len(), "override dataset merged");

    Reconciled {
        records,
        replaced,
        appended,
    }
}
