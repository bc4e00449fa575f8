//! Record reconciliation for poolset.
//!
//! This crate turns raw registry records into the exported dataset:
//! - [`normalize`]: subunit → whole-unit conversion of amount fields
//! - [`classify`]: group assignment through a pluggable strategy
//! - [`reconcile`]: ticker-level replacement by the override dataset
//! - [`manual_fixes`]: hand-maintained corrections applied last
//! - [`export`]: dataset and stake distribution writers
//! - [`pipeline`]: the end-to-end `run` workflow

pub mod classify;
pub mod diagnostics;
pub mod export;
pub mod manual_fixes;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;

pub use diagnostics::{Diagnostic, Diagnostics, RecordOrigin};
pub use pipeline::{ProgressReporter, RunResult, SilentProgress, run};
