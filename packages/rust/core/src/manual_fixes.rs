//! Hand-maintained corrections applied after reconciliation.
//!
//! These tables record known data-quality problems in the upstream sources.
//! They are data, not rules: edit the constants (or extend them from the
//! `[manual_fixes]` config section) when upstream data changes.

use std::collections::{BTreeMap, BTreeSet};

use poolset_shared::{Group, ManualFixesConfig, PoolRecord};
use tracing::{debug, info};

/// Pools whose registry entry has no ticker, with the ticker they publish.
pub const TICKER_CORRECTIONS: &[(&str, &str)] = &[
    ("pool1ktkhv4sw2y68d4xgfg9sjw829kejnvnh5zajq6g7jycry6cd7h5", "EMPL"),
    ("pool1a6wdglfp93m2z4nhptx9xhjazgyqusjpu387gdrp899cj98yuqq", "HYVEN"),
    ("pool1mgkn6k5esursgcwyvhxy7guhnx8cdwjjcfmz2t5hve5n7shtphl", "NIGHT"),
    ("pool1j045vdrzmj3hl36p50c6mhhpwtu2q7cmecnrqjuqq0khja02sr0", "BNB"),
];

/// Tickers that belong to multi-pool operators whatever the sources say.
pub const FORCED_MPO_TICKERS: &[&str] = &["GMO2"];

/// Prefix of tickers synthesized for pools that still have none.
pub const PLACEHOLDER_TICKER_PREFIX: &str = "private";

/// Number of trailing id characters appended to [`PLACEHOLDER_TICKER_PREFIX`].
pub const PLACEHOLDER_SUFFIX_LEN: usize = 4;

/// Counts of corrections made by [`ManualFixes::apply`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixSummary {
    /// Tickers taken from the correction table.
    pub tickers_corrected: usize,
    /// Placeholder tickers synthesized.
    pub placeholders: usize,
    /// Pools forced into MPO.
    pub forced_mpo: usize,
}

/// The effective correction tables.
#[derive(Debug, Clone)]
pub struct ManualFixes {
    tickers: BTreeMap<String, String>,
    mpo_tickers: BTreeSet<String>,
}

impl Default for ManualFixes {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ManualFixes {
    /// Only the built-in tables.
    pub fn builtin() -> Self {
        Self {
            tickers: TICKER_CORRECTIONS
                .iter()
                .map(|&(id, ticker)| (id.to_string(), ticker.to_string()))
                .collect(),
            mpo_tickers: FORCED_MPO_TICKERS.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Built-in tables extended by config. Built-in ticker entries win.
    pub fn with_config(config: &ManualFixesConfig) -> Self {
        let mut fixes = Self::builtin();
        for (id, ticker) in &config.tickers {
            fixes
                .tickers
                .entry(id.clone())
                .or_insert_with(|| ticker.clone());
        }
        fixes.mpo_tickers.extend(config.mpo_tickers.iter().cloned());
        fixes
    }

    /// Ticker correction for a pool id, if listed.
    pub fn ticker_for(&self, id: &str) -> Option<&str> {
        self.tickers.get(id).map(String::as_str)
    }

    /// Apply both tables to every record.
    ///
    /// Records without a ticker get the listed ticker for their id, or a
    /// placeholder built from the id. Records whose ticker is in the forced
    /// list become MPO.
    pub fn apply(&self, records: &mut [PoolRecord]) -> FixSummary {
        let mut summary = FixSummary::default();

        for record in records.iter_mut() {
            if record.ticker.is_none() {
                let ticker = match self.ticker_for(&record.id) {
                    Some(listed) => {
                        summary.tickers_corrected += 1;
                        listed.to_string()
                    }
                    None => {
                        summary.placeholders += 1;
                        placeholder_ticker(&record.id)
                    }
                };
                debug!(id = %record.id, %ticker, "ticker assigned by manual fix");
                record.ticker = Some(ticker);
            }

            if record
                .ticker
                .as_deref()
                .is_some_and(|t| self.mpo_tickers.contains(t))
                && record.group != Group::MultiOperator
            {
                debug!(id = %record.id, from = %record.group, "group forced to MPO");
                record.group = Group::MultiOperator;
                summary.forced_mpo += 1;
            }
        }

        info!(
            tickers_corrected = summary.tickers_corrected,
            placeholders = summary.placeholders,
            forced_mpo = summary.forced_mpo,
            "manual fixes applied"
        );

        summary
    }
}

/// Placeholder ticker for a pool id: the prefix plus the id's last characters.
pub fn placeholder_ticker(id: &str) -> String {
    let count = id.chars().count();
    let tail: String = id
        .chars()
        .skip(count.saturating_sub(PLACEHOLDER_SUFFIX_LEN))
        .collect();
    format!("{PLACEHOLDER_TICKER_PREFIX}{tail}")
}
