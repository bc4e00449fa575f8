//! Classification source adapter.
//!
//! A classification source is a single JSON document listing pools with a
//! class label. The list may be served flat, nested under a wrapper key in a
//! top-level object, or nested under a wrapper key in the first element of a
//! top-level array. Anything else is reported as malformed; the caller
//! decides how to degrade.

use poolset_shared::{ClassificationEntry, ClassificationSourceConfig, PoolsetError, Result};
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use crate::{build_client, get_json};

/// HTTP adapter for one classification source.
pub struct ClassificationAdapter {
    config: ClassificationSourceConfig,
    client: Client,
}

impl ClassificationAdapter {
    /// Create an adapter for the configured source.
    pub fn new(config: ClassificationSourceConfig) -> Result<Self> {
        let client = build_client(config.timeout_secs)?;
        Ok(Self { config, client })
    }

    /// Fetch and unwrap the source's entries, in source order.
    #[instrument(skip_all, fields(url = %self.config.url, mode = %self.config.mode))]
    pub async fn fetch(&self) -> Result<Vec<ClassificationEntry>> {
        let payload = get_json(&self.client, &self.config.url).await?;
        let entries = parse_entries(&payload, &self.config)?;
        info!(entries = entries.len(), "classification source fetched");
        Ok(entries)
    }
}

/// Unwrap a classification payload into entries.
///
/// Entries without a string key or without a string label are skipped.
pub fn parse_entries(
    payload: &Value,
    config: &ClassificationSourceConfig,
) -> Result<Vec<ClassificationEntry>> {
    let items = unwrap_list(payload, config.wrapper_key.as_deref())?;

    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        let Value::Object(obj) = item else {
            return Err(PoolsetError::validation(
                "classification list contains a non-object entry",
            ));
        };
        match entry_from(obj, config) {
            Some(entry) => entries.push(entry),
            None => debug!(?obj, "classification entry lacks key or label, skipped"),
        }
    }

    Ok(entries)
}

/// Locate the entry list inside a payload.
fn unwrap_list<'a>(payload: &'a Value, wrapper_key: Option<&str>) -> Result<&'a Vec<Value>> {
    let nested = |obj: &'a Map<String, Value>| -> Option<&'a Vec<Value>> {
        wrapper_key.and_then(|key| obj.get(key)).and_then(Value::as_array)
    };

    match payload {
        Value::Array(items) => {
            if let Some(Value::Object(first)) = items.first() {
                if let Some(list) = nested(first) {
                    return Ok(list);
                }
            }
            Ok(items)
        }
        Value::Object(obj) => nested(obj).ok_or_else(|| {
            PoolsetError::validation(format!(
                "classification payload is an object without a '{}' list",
                wrapper_key.unwrap_or("<none>")
            ))
        }),
        other => Err(PoolsetError::validation(format!(
            "classification payload has unexpected type: {}",
            json_type(other)
        ))),
    }
}

fn entry_from(
    obj: &Map<String, Value>,
    config: &ClassificationSourceConfig,
) -> Option<ClassificationEntry> {
    let key = obj
        .get(&config.key_field)
        .and_then(Value::as_str)
        .filter(|k| !k.is_empty())?;
    let class_label = obj.get(&config.label_field).and_then(Value::as_str)?;
    let display_name = config
        .display_field
        .as_deref()
        .and_then(|field| obj.get(field))
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(ClassificationEntry {
        key: key.to_string(),
        class_label: class_label.to_string(),
        display_name,
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
