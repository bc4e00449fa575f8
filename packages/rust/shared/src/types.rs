//! Core domain types for pool records and classification data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Field names
// ---------------------------------------------------------------------------

/// Registry identifier of a pool. Required for a record to reach the output.
pub const ID_FIELD: &str = "pool_id_bech32";

/// Short human-readable pool label, used as a secondary join key.
pub const TICKER_FIELD: &str = "ticker";

/// Pledge amount (subunits at the source, whole units after normalization).
pub const PLEDGE_FIELD: &str = "pledge";

/// Canonical stake field.
pub const STAKE_FIELD: &str = "active_stake";

/// Alias of [`STAKE_FIELD`] used by backup snapshots and override datasets.
pub const STAKE_ALIAS_FIELD: &str = "stake";

/// Lifecycle tag set by the registry.
pub const STATUS_FIELD: &str = "pool_status";

/// Classification label assigned by the pipeline.
pub const GROUP_FIELD: &str = "group";

/// Lifecycle value of pools excluded before the pipeline runs.
pub const RETIRED_STATUS: &str = "retired";

// ---------------------------------------------------------------------------
// RawRecord
// ---------------------------------------------------------------------------

/// An untyped key/value record exactly as a source adapter delivered it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(pub Map<String, Value>);

impl RawRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Borrow a field value. JSON `null` is returned as `Some(Value::Null)`.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Borrow a field as a string slice, if it holds a string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// Whether a field is absent or explicitly `null`.
    pub fn is_missing(&self, field: &str) -> bool {
        matches!(self.0.get(field), None | Some(Value::Null))
    }

    /// Set a field, returning the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Remove a field, returning its value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// The registry identifier, if present as a non-empty string.
    pub fn id(&self) -> Option<&str> {
        self.get_str(ID_FIELD).filter(|id| !id.is_empty())
    }

    /// Integer stake under either of its names. See [`stake_of`].
    pub fn stake(&self) -> Option<i64> {
        stake_of(&self.0)
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// ---------------------------------------------------------------------------
// Group
// ---------------------------------------------------------------------------

/// Operator classification of a pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Group {
    /// Single stake-pool operator (`"sSPO"`). Default when nothing matches.
    #[default]
    SingleOperator,
    /// Multi-pool operator (`"MPO"`).
    MultiOperator,
    /// A class defined by an external source and passed through verbatim.
    Other(String),
}

impl Group {
    /// Wire label for single-pool operators.
    pub const SSPO: &'static str = "sSPO";
    /// Wire label for multi-pool operators.
    pub const MPO: &'static str = "MPO";

    /// Interpret a label exactly, without any relabeling.
    pub fn parse(label: &str) -> Self {
        match label {
            Self::SSPO => Self::SingleOperator,
            Self::MPO => Self::MultiOperator,
            other => Self::Other(other.to_string()),
        }
    }

    /// The label written to exports.
    pub fn as_str(&self) -> &str {
        match self {
            Self::SingleOperator => Self::SSPO,
            Self::MultiOperator => Self::MPO,
            Self::Other(label) => label,
        }
    }
}

impl From<String> for Group {
    fn from(label: String) -> Self {
        Self::parse(&label)
    }
}

impl From<Group> for String {
    fn from(group: Group) -> Self {
        group.as_str().to_string()
    }
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PoolRecord
// ---------------------------------------------------------------------------

/// A pool that has an identifier and a group. Every exported record is one.
///
/// Fields the pipeline does not interpret (pledge, stake, status, anything a
/// source added) travel in `fields` and are written back out unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolRecord {
    /// Registry identifier.
    #[serde(rename = "pool_id_bech32")]
    pub id: String,
    /// Display ticker; `null` when no source knows one.
    #[serde(default)]
    pub ticker: Option<String>,
    /// Operator classification.
    #[serde(default)]
    pub group: Group,
    /// Remaining source fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl PoolRecord {
    /// Promote a raw record, or hand it back if it has no identifier.
    pub fn from_raw(mut raw: RawRecord) -> std::result::Result<Self, RawRecord> {
        let Some(id) = raw.id().map(str::to_string) else {
            return Err(raw);
        };
        raw.remove(ID_FIELD);

        let ticker = match raw.remove(TICKER_FIELD) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
        };
        let group = match raw.remove(GROUP_FIELD) {
            Some(Value::String(label)) => Group::parse(&label),
            _ => Group::default(),
        };

        Ok(Self {
            id,
            ticker,
            group,
            fields: raw.0,
        })
    }

    /// Canonical stake in whole units, if numeric.
    pub fn active_stake(&self) -> Option<i64> {
        self.fields.get(STAKE_FIELD).and_then(Value::as_i64)
    }

    /// Integer stake under either of its names. See [`stake_of`].
    pub fn stake(&self) -> Option<i64> {
        stake_of(&self.fields)
    }

    /// Whether the record's ticker equals `ticker`.
    pub fn has_ticker(&self, ticker: &str) -> bool {
        self.ticker.as_deref() == Some(ticker)
    }
}

/// Integer stake of a record's fields.
///
/// [`STAKE_FIELD`] and [`STAKE_ALIAS_FIELD`] name the same attribute. The
/// canonical name is read first; the alias only counts when the canonical
/// field is absent or `null`.
pub fn stake_of(fields: &Map<String, Value>) -> Option<i64> {
    match fields.get(STAKE_FIELD) {
        None | Some(Value::Null) => fields.get(STAKE_ALIAS_FIELD).and_then(Value::as_i64),
        Some(value) => value.as_i64(),
    }
}

// ---------------------------------------------------------------------------
// ClassificationEntry
// ---------------------------------------------------------------------------

/// One entry from an external classification source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationEntry {
    /// Join key: a pool id/hash or a ticker, depending on the source.
    pub key: String,
    /// The source's class for this key.
    pub class_label: String,
    /// Display ticker offered by the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawRecord {
        serde_json::from_value(value).expect("raw record")
    }

    #[test]
    fn group_labels() {
        assert_eq!(Group::parse("sSPO"), Group::SingleOperator);
        assert_eq!(Group::parse("MPO"), Group::MultiOperator);
        assert_eq!(Group::parse("Exchange"), Group::Other("Exchange".into()));
        assert_eq!(Group::default().as_str(), "sSPO");
    }

    #[test]
    fn group_serializes_as_plain_string() {
        let json = serde_json::to_string(&Group::MultiOperator).expect("serialize");
        assert_eq!(json, "\"MPO\"");
        let parsed: Group = serde_json::from_str("\"Custodian\"").expect("deserialize");
        assert_eq!(parsed, Group::Other("Custodian".into()));
    }

    #[test]
    fn from_raw_requires_id() {
        let missing = raw(json!({ "ticker": "ABC", "active_stake": 5 }));
        assert!(PoolRecord::from_raw(missing).is_err());

        let empty = raw(json!({ "pool_id_bech32": "", "ticker": "ABC" }));
        assert!(PoolRecord::from_raw(empty).is_err());
    }

    #[test]
    fn from_raw_splits_known_fields() {
        let record = PoolRecord::from_raw(raw(json!({
            "pool_id_bech32": "pool1abc",
            "ticker": null,
            "pledge": 10,
            "active_stake": 5,
        })))
        .expect("has id");

        assert_eq!(record.id, "pool1abc");
        assert_eq!(record.ticker, None);
        assert_eq!(record.group, Group::SingleOperator);
        assert_eq!(record.active_stake(), Some(5));
        assert!(!record.fields.contains_key(ID_FIELD));
    }

    #[test]
    fn stake_reads_either_name() {
        assert_eq!(raw(json!({ "active_stake": 7 })).stake(), Some(7));
        assert_eq!(raw(json!({ "stake": 8 })).stake(), Some(8));
        assert_eq!(raw(json!({ "active_stake": null, "stake": 3 })).stake(), Some(3));
        assert_eq!(raw(json!({ "active_stake": 4, "stake": 9 })).stake(), Some(4));
        // An unconverted canonical value is not replaced by the alias.
        assert_eq!(raw(json!({ "active_stake": "n/a", "stake": 9 })).stake(), None);
        assert_eq!(raw(json!({ "pledge": 1 })).stake(), None);
    }

    #[test]
    fn pool_record_serialization_uses_registry_keys() {
        let record = PoolRecord {
            id: "p1".into(),
            ticker: Some("ABC".into()),
            group: Group::MultiOperator,
            fields: Map::from_iter([(STAKE_FIELD.to_string(), json!(9))]),
        };

        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(
            value,
            json!({ "pool_id_bech32": "p1", "ticker": "ABC", "group": "MPO", "active_stake": 9 })
        );

        let parsed: PoolRecord = serde_json::from_value(value).expect("deserialize");
        assert_eq!(parsed, record);
    }
}
