//! Non-fatal problems found while reconciling records.
//!
//! Every diagnostic is logged when it is recorded and kept for the run
//! summary. None of them stops the pipeline.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Where a record without an identifier came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordOrigin {
    /// The primary registry or a snapshot of it.
    Primary,
    /// The authoritative override dataset.
    Overrides,
}

impl std::fmt::Display for RecordOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Overrides => f.write_str("overrides"),
        }
    }
}

/// A single non-fatal problem.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A numeric field could not be converted; its value was kept as-is.
    FieldConversion {
        id: Option<String>,
        field: String,
        value: Value,
    },
    /// A record had no identifier and was dropped.
    MissingId { origin: RecordOrigin, record: Value },
    /// A classification source listed the same key twice; the later entry won.
    DuplicateClassificationKey {
        key: String,
        discarded: String,
        kept: String,
    },
    /// The classification source could not be used; every pool defaulted to sSPO.
    ClassificationUnavailable { reason: String },
    /// Registry pagination stopped early; the dataset is partial.
    SourceInterrupted { reason: String },
}

/// Collector for [`Diagnostic`]s.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log and keep a diagnostic.
    pub fn record(&mut self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::FieldConversion { id, field, value } => warn!(
                id = id.as_deref().unwrap_or("N/A"),
                field,
                %value,
                "could not convert field, value left unchanged"
            ),
            Diagnostic::MissingId { origin, record } => warn!(
                %origin,
                %record,
                "record has no pool id, skipping"
            ),
            Diagnostic::DuplicateClassificationKey {
                key,
                discarded,
                kept,
            } => debug!(
                key,
                discarded,
                kept,
                "duplicate classification key, using the last entry"
            ),
            Diagnostic::ClassificationUnavailable { reason } => warn!(
                reason,
                "classification source unavailable, defaulting every pool to sSPO"
            ),
            Diagnostic::SourceInterrupted { reason } => warn!(
                reason,
                "primary source interrupted, continuing with partial data"
            ),
        }
        self.entries.push(diagnostic);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of records dropped for lacking an identifier.
    pub fn missing_ids(&self) -> usize {
        self.iter()
            .filter(|d| matches!(d, Diagnostic::MissingId { .. }))
            .count()
    }

    /// Number of field conversion failures.
    pub fn field_conversions(&self) -> usize {
        self.iter()
            .filter(|d| matches!(d, Diagnostic::FieldConversion { .. }))
            .count()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
