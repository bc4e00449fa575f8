//! Paginated primary registry adapter.
//!
//! Walks the registry's pool list with `offset`/`limit` until an empty page
//! comes back, and drops pools the pipeline never sees: retired pools and
//! pools without an active stake.

use poolset_shared::{
    PoolsetError, PrimarySourceConfig, RETIRED_STATUS, RawRecord, Result, STAKE_ALIAS_FIELD,
    STAKE_FIELD, STATUS_FIELD,
};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::{build_client, get_json};

// ---------------------------------------------------------------------------
// RegistryFetch
// ---------------------------------------------------------------------------

/// Outcome of a full paginated fetch.
#[derive(Debug, Clone, Default)]
pub struct RegistryFetch {
    /// Records that passed the exclusion filter, in registry order.
    pub records: Vec<RawRecord>,
    /// Number of non-empty pages received.
    pub pages: usize,
    /// Records removed by the exclusion filter.
    pub excluded: usize,
    /// Set when pagination stopped early because a page failed.
    pub interrupted: Option<String>,
}

// ---------------------------------------------------------------------------
// Exclusion filter
// ---------------------------------------------------------------------------

/// Whether a record is excluded before it reaches the pipeline.
///
/// Snapshots may carry the stake under its alias, so a record is only
/// stakeless when both names are absent or null.
pub fn is_excluded(record: &RawRecord) -> bool {
    record.get_str(STATUS_FIELD) == Some(RETIRED_STATUS)
        || (record.is_missing(STAKE_FIELD) && record.is_missing(STAKE_ALIAS_FIELD))
}

/// Split off excluded records, returning the kept ones and the excluded count.
pub fn apply_exclusions(records: Vec<RawRecord>) -> (Vec<RawRecord>, usize) {
    let before = records.len();
    let kept: Vec<RawRecord> = records.into_iter().filter(|r| !is_excluded(r)).collect();
    let excluded = before - kept.len();
    (kept, excluded)
}

// ---------------------------------------------------------------------------
// RegistryAdapter
// ---------------------------------------------------------------------------

/// HTTP adapter for the primary pool registry.
pub struct RegistryAdapter {
    config: PrimarySourceConfig,
    client: Client,
}

impl RegistryAdapter {
    /// Create an adapter for the configured registry endpoint.
    pub fn new(config: PrimarySourceConfig) -> Result<Self> {
        if config.page_size == 0 {
            return Err(PoolsetError::config("primary.page_size must be positive"));
        }
        let client = build_client(config.timeout_secs)?;
        Ok(Self { config, client })
    }

    /// Build the request URL for one page.
    fn page_url(&self, offset: u64, limit: u32) -> Result<Url> {
        let mut url = Url::parse(&self.config.url).map_err(|e| {
            PoolsetError::config(format!("invalid primary.url '{}': {e}", self.config.url))
        })?;
        {
            let mut query = url.query_pairs_mut();
            if !self.config.select.is_empty() {
                query.append_pair("select", &self.config.select.join(","));
            }
            query.append_pair("offset", &offset.to_string());
            query.append_pair("limit", &limit.to_string());
        }
        Ok(url)
    }

    /// Fetch a single page of raw records, unfiltered.
    #[instrument(skip(self))]
    pub async fn fetch_page(&self, offset: u64, limit: u32) -> Result<Vec<RawRecord>> {
        let url = self.page_url(offset, limit)?;
        let payload = get_json(&self.client, url.as_str()).await?;

        let Value::Array(items) = payload else {
            return Err(PoolsetError::validation(format!(
                "{url}: expected a JSON array of pools"
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
                offset,
                skipped = total - records.len(),
                "registry page contained non-object entries"
            );
        }

        debug!(offset, count = records.len(), "registry page fetched");
        Ok(records)
    }

    /// Fetch every page and apply the exclusion filter.
    ///
    /// `on_page` is called with the offset and record count of each non-empty
    /// page. A failing page ends pagination and sets `interrupted`; records
    /// gathered before it are kept, so a failure on the first page yields an
    /// empty fetch.
    #[instrument(skip_all, fields(url = %self.config.url, page_size = self.config.page_size))]
    pub async fn fetch_all(&self, mut on_page: impl FnMut(u64, usize)) -> RegistryFetch {
        let limit = self.config.page_size;
        let mut offset: u64 = 0;
        let mut fetch = RegistryFetch::default();

        loop {
            let batch = match self.fetch_page(offset, limit).await {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(
                        offset,
                        error = %e,
                        kept = fetch.records.len(),
                        "registry page failed, continuing with partial data"
                    );
                    fetch.interrupted = Some(e.to_string());
                    break;
                }
            };

            if batch.is_empty() {
                break;
            }

            fetch.pages += 1;
            on_page(offset, batch.len());

            let (kept, excluded) = apply_exclusions(batch);
            fetch.excluded += excluded;
            fetch.records.extend(kept);

            offset += u64::from(limit);
        }

        info!(
            pages = fetch.pages,
            records = fetch.records.len(),
            excluded = fetch.excluded,
            "registry fetch complete"
        );

        fetch
    }
}
