//! Source adapters for pool data.
//!
//! This crate provides:
//! - [`registry`]: paginated primary registry adapter with the exclusion filter
//! - [`classification`]: single-shot classification source adapter
//! - [`snapshot`]: local JSON datasets (snapshots and the override dataset)
//!
//! Adapters only fetch and unwrap. Every decision about what a record means
//! is made downstream in `poolset-core`.

pub mod classification;
pub mod registry;
pub mod snapshot;

use std::time::Duration;

use poolset_shared::{PoolsetError, Result};
use reqwest::Client;

pub use classification::{ClassificationAdapter, parse_entries};
pub use registry::{RegistryAdapter, RegistryFetch, apply_exclusions, is_excluded};
pub use snapshot::{load_overrides, load_records};

/// User-Agent string for source requests.
const USER_AGENT: &str = concat!("poolset/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Build a reqwest client with the given timeout.
fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| PoolsetError::Network(format!("failed to build HTTP client: {e}")))
}

/// GET a URL and decode the body as JSON.
async fn get_json(client: &Client, url: &str) -> Result<serde_json::Value> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| PoolsetError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(PoolsetError::Network(format!("{url}: HTTP {status}")));
    }

    let body = response
        .text()
        .await
        .map_err(|e| PoolsetError::Network(format!("{url}: failed to read body: {e}")))?;

    serde_json::from_str(&body).map_err(|e| PoolsetError::parse(format!("{url}: {e}")))
}
