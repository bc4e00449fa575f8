//! End-to-end `run` pipeline: sources → normalize → classify → reconcile → fix → export.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use poolset_shared::{
    ClassificationEntry, ClassificationMode, ClassificationSourceConfig, PipelineConfig,
    PoolRecord, RawRecord, Result,
};
use poolset_sources::{ClassificationAdapter, RegistryAdapter};

use crate::classify::Classifier;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::export;
use crate::manual_fixes::{FixSummary, ManualFixes};
use crate::normalize::normalize_all;
use crate::reconcile::{Reconciled, reconcile};

/// Result of the `run` pipeline.
#[derive(Debug)]
pub struct RunResult {
    /// Path of the full dataset export.
    pub pools_path: PathBuf,
    /// Path of the stake distribution export.
    pub stakes_path: PathBuf,
    /// Rows written to the stake distribution.
    pub stakes_exported: usize,
    /// Primary records that passed the exclusion filter.
    pub fetched: usize,
    /// Primary records removed by the exclusion filter.
    pub excluded: usize,
    /// Records dropped for lacking a pool id.
    pub dropped: usize,
    /// Primary records replaced by the override dataset.
    pub replaced: usize,
    /// Override records appended.
    pub appended: usize,
    /// Records in the exported dataset.
    pub final_count: usize,
    /// Exported records per group label.
    pub group_counts: BTreeMap<String, usize>,
    /// Classification strategy used, `"none"` when every pool defaulted.
    pub strategy: String,
    /// Whether the configured classification source could not be used.
    pub classification_degraded: bool,
    /// Manual corrections made.
    pub fixes: FixSummary,
    /// Every non-fatal problem met during the run.
    pub diagnostics: Diagnostics,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called for each non-empty registry page.
    fn page_fetched(&self, offset: u64, count: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &RunResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_fetched(&self, _offset: u64, _count: usize) {}
    fn done(&self, _result: &RunResult) {}
}

/// What the classification stage has to work with.
#[derive(Debug, Clone)]
pub enum ClassificationFeed {
    /// No source configured.
    Disabled,
    /// Entries fetched from a source read with `mode`.
    Entries {
        mode: ClassificationMode,
        entries: Vec<ClassificationEntry>,
    },
    /// The configured source failed or returned an unusable payload.
    Unavailable { reason: String },
}

/// Output of [`process`].
#[derive(Debug, Clone)]
pub struct Processed {
    /// Final dataset, in export order.
    pub records: Vec<PoolRecord>,
    /// Classification strategy used.
    pub strategy: String,
    /// Whether classification fell back because the source was unavailable.
    pub classification_degraded: bool,
    /// Primary records replaced by the override dataset.
    pub replaced: usize,
    /// Override records appended.
    pub appended: usize,
    /// Manual corrections made.
    pub fixes: FixSummary,
}

/// Transform fetched records into the final dataset.
///
/// Runs every decision stage in order without touching the network or the
/// filesystem. Problems along the way land in `diags`.
pub fn process(
    mut records: Vec<RawRecord>,
    feed: ClassificationFeed,
    overrides: Vec<RawRecord>,
    fixes: &ManualFixes,
    diags: &mut Diagnostics,
) -> Processed {
    normalize_all(&mut records, diags);

    let (classifier, classification_degraded) = match feed {
        ClassificationFeed::Disabled => (Classifier::fallback(), false),
        ClassificationFeed::Entries { mode, entries } => {
            (Classifier::for_mode(mode, entries, diags), false)
        }
        ClassificationFeed::Unavailable { reason } => {
            diags.record(Diagnostic::ClassificationUnavailable { reason });
            (Classifier::fallback(), true)
        }
    };
    let classified = classifier.classify(records, diags);

    let Reconciled {
        mut records,
        replaced,
        appended,
    } = reconcile(classified, overrides, diags);

    let fix_summary = fixes.apply(&mut records);

    Processed {
        records,
        strategy: classifier.strategy_name().to_string(),
        classification_degraded,
        replaced,
        appended,
        fixes: fix_summary,
    }
}

/// Run the full pipeline and write both exports.
///
/// 1. Load the override dataset (the only hard dependency)
/// 2. Fetch primary records and classification entries concurrently; a
///    failing source degrades to partial or no data
/// 3. Normalize, classify, reconcile and fix
/// 4. Write the dataset and the stake distribution
#[instrument(skip_all, fields(pools = %config.pools_path().display()))]
pub async fn run(config: &PipelineConfig, progress: &dyn ProgressReporter) -> Result<RunResult> {
    let start = Instant::now();
    config.validate()?;

    // --- Phase 1: Override dataset ---
    progress.phase("Loading override dataset");
    let overrides = poolset_sources::load_overrides(&config.overrides_path)?;

    // --- Phase 2: Sources ---
    progress.phase("Fetching pool records");
    let (primary, feed) = tokio::join!(
        fetch_primary(config, progress),
        fetch_classification(&config.classification),
    );
    let primary = primary?;

    let mut diags = Diagnostics::new();
    if let Some(reason) = primary.interrupted {
        diags.record(Diagnostic::SourceInterrupted { reason });
    }
    if primary.records.is_empty() {
        warn!("no primary records available, exporting override records only");
    }
    let fetched = primary.records.len();

    // --- Phase 3: Reconcile ---
    progress.phase("Reconciling records");
    let fixes = ManualFixes::with_config(&config.manual_fixes);
    let processed = process(primary.records, feed, overrides, &fixes, &mut diags);

    // --- Phase 4: Export ---
    progress.phase("Writing exports");
    let pools_path = config.pools_path();
    export::write_pools_json(&pools_path, &processed.records)?;
    let stakes = export::export_stakes(&config.output_dir, &processed.records)?;

    let mut group_counts = BTreeMap::new();
    for record in &processed.records {
        *group_counts
            .entry(record.group.as_str().to_string())
            .or_insert(0) += 1;
    }

    let result = RunResult {
        pools_path,
        stakes_path: stakes.path,
        stakes_exported: stakes.count,
        fetched,
        excluded: primary.excluded,
        dropped: diags.missing_ids(),
        replaced: processed.replaced,
        appended: processed.appended,
        final_count: processed.records.len(),
        group_counts,
        strategy: processed.strategy,
        classification_degraded: processed.classification_degraded,
        fixes: processed.fixes,
        diagnostics: diags,
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        fetched = result.fetched,
        final_count = result.final_count,
        strategy = %result.strategy,
        diagnostics = result.diagnostics.len(),
        elapsed_ms = result.elapsed.as_millis(),
        "run pipeline complete"
    );

    Ok(result)
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

struct PrimaryRecords {
    records: Vec<RawRecord>,
    excluded: usize,
    interrupted: Option<String>,
}

/// Primary records from the snapshot when one is configured, else the registry.
async fn fetch_primary(
    config: &PipelineConfig,
    progress: &dyn ProgressReporter,
) -> Result<PrimaryRecords> {
    if let Some(input) = &config.input {
        let (records, excluded) =
            poolset_sources::apply_exclusions(poolset_sources::load_records(input)?);
        info!(path = %input.display(), records = records.len(), excluded, "snapshot loaded");
        return Ok(PrimaryRecords {
            records,
            excluded,
            interrupted: None,
        });
    }

    let adapter = RegistryAdapter::new(config.primary.clone())?;
    let fetch = adapter
        .fetch_all(|offset, count| progress.page_fetched(offset, count))
        .await;

    Ok(PrimaryRecords {
        records: fetch.records,
        excluded: fetch.excluded,
        interrupted: fetch.interrupted,
    })
}

/// Classification entries, or the reason they are unavailable.
async fn fetch_classification(config: &ClassificationSourceConfig) -> ClassificationFeed {
    if config.mode == ClassificationMode::None {
        return ClassificationFeed::Disabled;
    }

    let fetched = match ClassificationAdapter::new(config.clone()) {
        Ok(adapter) => adapter.fetch().await,
        Err(e) => Err(e),
    };

    match fetched {
        Ok(entries) => ClassificationFeed::Entries {
            mode: config.mode,
            entries,
        },
        Err(e) => {
            warn!(url = %config.url, error = %e, "classification fetch failed");
            ClassificationFeed::Unavailable {
                reason: e.to_string(),
            }
        }
    }
}
