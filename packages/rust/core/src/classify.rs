//! Group assignment.
//!
//! A [`Classifier`] promotes raw records to [`PoolRecord`]s and gives each
//! one a [`Group`]. Which classification source is consulted, and how its
//! labels are read, is decided by a single [`GroupStrategy`]:
//!
//! - [`HashKeyedStrategy`] joins on the pool id. `SINGLEPOOL` means sSPO,
//!   any other label means MPO.
//! - [`TickerKeyedStrategy`] joins on the ticker and takes the label as-is.
//!
//! Pools the strategy does not match, and every pool when no strategy is
//! available, are sSPO.

use std::collections::HashMap;

use poolset_shared::{ClassificationEntry, ClassificationMode, Group, PoolRecord, RawRecord};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::diagnostics::{Diagnostic, Diagnostics, RecordOrigin};

/// Label a hash-keyed source uses for single-pool operators.
pub const SINGLE_POOL_LABEL: &str = "SINGLEPOOL";

// ---------------------------------------------------------------------------
// ClassificationIndex
// ---------------------------------------------------------------------------

/// Classification entries indexed by their join key.
#[derive(Debug, Clone, Default)]
pub struct ClassificationIndex {
    by_key: HashMap<String, ClassificationEntry>,
}

impl ClassificationIndex {
    /// Index entries in source order. A repeated key keeps the last entry.
    pub fn build(entries: Vec<ClassificationEntry>, diags: &mut Diagnostics) -> Self {
        let mut by_key: HashMap<String, ClassificationEntry> =
            HashMap::with_capacity(entries.len());

        for entry in entries {
            let key = entry.key.clone();
            if let Some(previous) = by_key.insert(key.clone(), entry) {
                let kept = &by_key[&key];
                diags.record(Diagnostic::DuplicateClassificationKey {
                    key,
                    discarded: describe(&previous),
                    kept: describe(kept),
                });
            }
        }

        Self { by_key }
    }

    pub fn get(&self, key: &str) -> Option<&ClassificationEntry> {
        self.by_key.get(key)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

fn describe(entry: &ClassificationEntry) -> String {
    match &entry.display_name {
        Some(name) => format!("{} ({name})", entry.class_label),
        None => entry.class_label.clone(),
    }
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// What a strategy found for one pool.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMatch {
    /// Group to assign.
    pub group: Group,
    /// Ticker offered by the source, adopted when the pool has none.
    pub display_name: Option<String>,
}

/// A way of looking up a pool in a classification source.
pub trait GroupStrategy: Send + Sync {
    /// Match a pool, or `None` when the source does not know it.
    fn lookup(&self, record: &PoolRecord) -> Option<GroupMatch>;

    /// Human-readable strategy name for tracing.
    fn name(&self) -> &str;
}

/// Joins on the pool id and reduces labels to sSPO/MPO.
pub struct HashKeyedStrategy {
    index: ClassificationIndex,
}

impl HashKeyedStrategy {
    pub fn new(index: ClassificationIndex) -> Self {
        Self { index }
    }
}

impl GroupStrategy for HashKeyedStrategy {
    fn lookup(&self, record: &PoolRecord) -> Option<GroupMatch> {
        let entry = self.index.get(&record.id)?;
        let group = if entry.class_label == SINGLE_POOL_LABEL {
            Group::SingleOperator
        } else {
            Group::MultiOperator
        };
        Some(GroupMatch {
            group,
            display_name: entry.display_name.clone(),
        })
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// Joins on the ticker and assigns the source's label verbatim.
pub struct TickerKeyedStrategy {
    index: ClassificationIndex,
}

impl TickerKeyedStrategy {
    pub fn new(index: ClassificationIndex) -> Self {
        Self { index }
    }
}

impl GroupStrategy for TickerKeyedStrategy {
    fn lookup(&self, record: &PoolRecord) -> Option<GroupMatch> {
        let ticker = record.ticker.as_deref()?;
        let entry = self.index.get(ticker)?;
        Some(GroupMatch {
            group: Group::parse(&entry.class_label),
            display_name: entry.display_name.clone(),
        })
    }

    fn name(&self) -> &str {
        "ticker"
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Assigns a group to every record that has an identifier.
pub struct Classifier {
    strategy: Option<Box<dyn GroupStrategy>>,
}

impl Classifier {
    /// Classify with the given strategy.
    pub fn new(strategy: Box<dyn GroupStrategy>) -> Self {
        Self {
            strategy: Some(strategy),
        }
    }

    /// Classifier used when no source is configured or the source failed:
    /// every pool is sSPO and no ticker is backfilled.
    pub fn fallback() -> Self {
        Self { strategy: None }
    }

    /// Build the strategy matching `mode` over the given entries.
    pub fn for_mode(
        mode: ClassificationMode,
        entries: Vec<ClassificationEntry>,
        diags: &mut Diagnostics,
    ) -> Self {
        let index = |diags: &mut Diagnostics| {
            let index = ClassificationIndex::build(entries, diags);
            if index.is_empty() {
                warn!(%mode, "classification source has no usable entries, every pool defaults to sSPO");
            }
            index
        };
        match mode {
            ClassificationMode::None => Self::fallback(),
            ClassificationMode::Hash => Self::new(Box::new(HashKeyedStrategy::new(index(diags)))),
            ClassificationMode::Ticker => {
                Self::new(Box::new(TickerKeyedStrategy::new(index(diags))))
            }
        }
    }

    /// Name of the active strategy, `"none"` for the fallback.
    pub fn strategy_name(&self) -> &str {
        self.strategy.as_deref().map_or("none", |s| s.name())
    }

    /// Whether this is the fallback classifier.
    pub fn is_fallback(&self) -> bool {
        self.strategy.is_none()
    }

    /// Promote and classify records, preserving input order.
    ///
    /// Records without an identifier are dropped with a
    /// [`Diagnostic::MissingId`].
    #[instrument(skip_all, fields(strategy = self.strategy_name(), records = records.len()))]
    pub fn classify(&self, records: Vec<RawRecord>, diags: &mut Diagnostics) -> Vec<PoolRecord> {
        let mut classified = Vec::with_capacity(records.len());
        let mut matched = 0usize;

        for raw in records {
            let mut record = match PoolRecord::from_raw(raw) {
                Ok(record) => record,
                Err(raw) => {
                    diags.record(Diagnostic::MissingId {
                        origin: RecordOrigin::Primary,
                        record: Value::Object(raw.0),
                    });
                    continue;
                }
            };

            record.group = match self.strategy.as_deref().and_then(|s| s.lookup(&record)) {
                Some(found) => {
                    matched += 1;
                    if record.ticker.is_none() {
                        if let Some(name) = found.display_name {
                            debug!(
                                id = %record.id,
                                ticker = %name,
                                "ticker taken from classification source"
                            );
                            record.ticker = Some(name);
                        }
                    }
                    found.group
                }
                None => Group::SingleOperator,
            };

            classified.push(record);
        }

        info!(
            classified = classified.len(),
            matched,
            "group assignment complete"
        );

        classified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawRecord {
        serde_json::from_value(value).expect("raw record")
    }

    fn entry(key: &str, label: &str, display: Option<&str>) -> ClassificationEntry {
        ClassificationEntry {
            key: key.into(),
            class_label: label.into(),
            display_name: display.map(String::from),
        }
    }

    #[test]
    fn index_keeps_last_duplicate() {
        let mut diags = Diagnostics::new();
        let index = ClassificationIndex::build(
            vec![
                entry("pool1a", "SINGLEPOOL", Some("OLD")),
                entry("pool1b", "SINGLEPOOL", None),
                entry("pool1a", "BIGCORP", Some("NEW")),
            ],
            &mut diags,
        );

        assert_eq!(index.len(), 2);
        assert_eq!(index.get("pool1a").unwrap().class_label, "BIGCORP");
        assert_eq!(
            diags.iter().collect::<Vec<_>>(),
            vec![&Diagnostic::DuplicateClassificationKey {
                key: "pool1a".into(),
                discarded: "SINGLEPOOL (OLD)".into(),
                kept: "BIGCORP (NEW)".into(),
            }]
        );
    }

    #[test]
    fn empty_source_defaults_every_pool() {
        let mut diags = Diagnostics::new();
        assert!(ClassificationIndex::build(Vec::new(), &mut diags).is_empty());

        let classifier = Classifier::for_mode(ClassificationMode::Hash, Vec::new(), &mut diags);
        assert_eq!(classifier.strategy_name(), "hash");
        let out = classifier.classify(
            vec![
                raw(json!({ "pool_id_bech32": "p1" })),
                raw(json!({ "pool_id_bech32": "p2", "ticker": "TWO" })),
            ],
            &mut diags,
        );

        assert!(out.iter().all(|r| r.group == Group::SingleOperator));
        assert!(diags.is_empty());
    }

    #[test]
    fn hash_strategy_maps_labels() {
        let mut diags = Diagnostics::new();
        let classifier = Classifier::for_mode(
            ClassificationMode::Hash,
            vec![
                entry("p1", "SINGLEPOOL", None),
                entry("p2", "OTHER", None),
            ],
            &mut diags,
        );

        let out = classifier.classify(
            vec![
                raw(json!({ "pool_id_bech32": "p1", "ticker": "ONE" })),
                raw(json!({ "pool_id_bech32": "p2", "ticker": "TWO" })),
                raw(json!({ "pool_id_bech32": "p3", "ticker": "THREE" })),
            ],
            &mut diags,
        );

        let groups: Vec<&str> = out.iter().map(|r| r.group.as_str()).collect();
        assert_eq!(groups, vec!["sSPO", "MPO", "sSPO"]);
        assert_eq!(classifier.strategy_name(), "hash");
    }

    #[test]
    fn ticker_strategy_assigns_label_verbatim() {
        let mut diags = Diagnostics::new();
        let classifier = Classifier::for_mode(
            ClassificationMode::Ticker,
            vec![
                entry("ONE", "MPO", None),
                entry("TWO", "Exchange", None),
                entry("p3", "MPO", None),
            ],
            &mut diags,
        );

        let out = classifier.classify(
            vec![
                raw(json!({ "pool_id_bech32": "p1", "ticker": "ONE" })),
                raw(json!({ "pool_id_bech32": "p2", "ticker": "TWO" })),
                raw(json!({ "pool_id_bech32": "p3", "ticker": "THREE" })),
                raw(json!({ "pool_id_bech32": "p4", "ticker": null })),
            ],
            &mut diags,
        );

        assert_eq!(out[0].group, Group::MultiOperator);
        assert_eq!(out[1].group, Group::Other("Exchange".into()));
        // Keyed by ticker only: an id match does not count.
        assert_eq!(out[2].group, Group::SingleOperator);
        assert_eq!(out[3].group, Group::SingleOperator);
    }

    #[test]
    fn backfills_missing_ticker_only() {
        let mut diags = Diagnostics::new();
        let classifier = Classifier::for_mode(
            ClassificationMode::Hash,
            vec![
                entry("p1", "SINGLEPOOL", Some("FROMSRC")),
                entry("p2", "SINGLEPOOL", Some("IGNORED")),
            ],
            &mut diags,
        );

        let out = classifier.classify(
            vec![
                raw(json!({ "pool_id_bech32": "p1", "ticker": null })),
                raw(json!({ "pool_id_bech32": "p2", "ticker": "OWN" })),
            ],
            &mut diags,
        );

        assert_eq!(out[0].ticker.as_deref(), Some("FROMSRC"));
        assert_eq!(out[1].ticker.as_deref(), Some("OWN"));
    }

    #[test]
    fn fallback_defaults_everything_without_backfill() {
        let classifier = Classifier::fallback();
        let mut diags = Diagnostics::new();
        let out = classifier.classify(
            vec![
                raw(json!({ "pool_id_bech32": "p1", "ticker": null, "group": "MPO" })),
                raw(json!({ "pool_id_bech32": "p2", "ticker": "TWO" })),
            ],
            &mut diags,
        );

        assert!(classifier.is_fallback());
        assert_eq!(classifier.strategy_name(), "none");
        assert!(out.iter().all(|r| r.group == Group::SingleOperator));
        assert_eq!(out[0].ticker, None);
    }

    #[test]
    fn drops_records_without_id() {
        let classifier = Classifier::fallback();
        let mut diags = Diagnostics::new();
        let out = classifier.classify(
            vec![
                raw(json!({ "ticker": "ANON", "active_stake": 3 })),
                raw(json!({ "pool_id_bech32": "p1" })),
                raw(json!({ "pool_id_bech32": null, "ticker": "NULL" })),
            ],
            &mut diags,
        );

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "p1");
        assert_eq!(diags.missing_ids(), 2);
    }

    #[test]
    fn classification_is_deterministic() {
        let entries = vec![
            entry("p1", "SINGLEPOOL", None),
            entry("p2", "A", None),
            entry("p1", "B", None),
            entry("p3", "SINGLEPOOL", None),
        ];
        let records: Vec<RawRecord> = (1..=4)
            .map(|i| raw(json!({ "pool_id_bech32": format!("p{i}") })))
            .collect();

        let run = || {
            let mut diags = Diagnostics::new();
            Classifier::for_mode(ClassificationMode::Hash, entries.clone(), &mut diags)
                .classify(records.clone(), &mut diags)
                .into_iter()
                .map(|r| r.group)
                .collect::<Vec<_>>()
        };

        let first = run();
        for _ in 0..5 {
            assert_eq!(run(), first);
        }
        assert_eq!(
            first,
            vec![
                Group::MultiOperator,
                Group::MultiOperator,
                Group::SingleOperator,
                Group::SingleOperator,
            ]
        );
    }
}
