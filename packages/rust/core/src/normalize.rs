//! Subunit → whole-unit conversion of numeric pool fields.

use poolset_shared::{PLEDGE_FIELD, RawRecord, STAKE_ALIAS_FIELD, STAKE_FIELD};
use serde_json::Value;

use crate::diagnostics::{Diagnostic, Diagnostics};

/// Subunits per whole unit (lovelace per ADA).
pub const SUBUNITS_PER_UNIT: i128 = 1_000_000;

/// Fields converted by [`normalize_all`]. Both stake names are converted
/// independently when present.
pub const AMOUNT_FIELDS: [&str; 3] = [PLEDGE_FIELD, STAKE_ALIAS_FIELD, STAKE_FIELD];

/// Convert every present, non-null target field of `record` in place.
///
/// The stored result is the integer value divided by [`SUBUNITS_PER_UNIT`],
/// truncated. A value that is not integer-like is left untouched and a
/// [`Diagnostic::FieldConversion`] is recorded.
pub fn normalize_record(record: &mut RawRecord, fields: &[&str], diags: &mut Diagnostics) {
    for &field in fields {
        let converted = match record.get(field) {
            None | Some(Value::Null) => continue,
            Some(value) => to_whole_units(value).ok_or_else(|| value.clone()),
        };

        match converted {
            Ok(units) => {
                record.insert(field, Value::from(units));
            }
            Err(value) => diags.record(Diagnostic::FieldConversion {
                id: record.id().map(str::to_string),
                field: field.to_string(),
                value,
            }),
        }
    }
}

/// Normalize the amount fields of every record.
pub fn normalize_all(records: &mut [RawRecord], diags: &mut Diagnostics) {
    for record in records.iter_mut() {
        normalize_record(record, &AMOUNT_FIELDS, diags);
    }
}

/// Whole units for an integer-like subunit value.
fn to_whole_units(value: &Value) -> Option<i64> {
    let subunits = parse_integer(value)?;
    i64::try_from(subunits / SUBUNITS_PER_UNIT).ok()
}

/// Integer reading of a JSON value.
///
/// Accepts integers, finite floats (truncated) and strings holding a
/// base-10 integer with optional sign, surrounding whitespace and `_`
/// digit separators. Booleans, decimals in strings and containers are
/// rejected.
fn parse_integer(value: &Value) -> Option<i128> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i128::from(i))
            } else if let Some(u) = n.as_u64() {
                Some(i128::from(u))
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i128)
            }
        }
        Value::String(s) => parse_integer_str(s),
        _ => None,
    }
}

fn parse_integer_str(s: &str) -> Option<i128> {
    let trimmed = s.trim();
    let digits = trimmed.trim_start_matches(['+', '-']);
    if digits.is_empty()
        || trimmed.len() - digits.len() > 1
        || digits.starts_with('_')
        || digits.ends_with('_')
        || digits.contains("__")
    {
        return None;
    }
    trimmed.replace('_', "").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawRecord {
        serde_json::from_value(value).expect("raw record")
    }

    #[test]
    fn converts_strings_and_numbers() {
        let mut record = raw(json!({
            "pool_id_bech32": "pool1a",
            "pledge": "250000000",
            "active_stake": 5_000_000,
        }));
        let mut diags = Diagnostics::new();
        normalize_record(&mut record, &AMOUNT_FIELDS, &mut diags);

        assert_eq!(record.get("pledge"), Some(&json!(250)));
        assert_eq!(record.get("active_stake"), Some(&json!(5)));
        assert!(diags.is_empty());
    }

    #[test]
    fn truncates_toward_zero() {
        let mut record = raw(json!({ "pledge": "1999999", "active_stake": 999_999, "stake": 12.9e6 }));
        normalize_all(std::slice::from_mut(&mut record), &mut Diagnostics::new());

        assert_eq!(record.get("pledge"), Some(&json!(1)));
        assert_eq!(record.get("active_stake"), Some(&json!(0)));
        assert_eq!(record.get("stake"), Some(&json!(12)));
    }

    #[test]
    fn both_stake_names_are_converted_independently() {
        let mut record = raw(json!({ "stake": "3000000", "active_stake": "8000000" }));
        normalize_all(std::slice::from_mut(&mut record), &mut Diagnostics::new());

        assert_eq!(record.get("stake"), Some(&json!(3)));
        assert_eq!(record.get("active_stake"), Some(&json!(8)));
    }

    #[test]
    fn non_numeric_value_is_kept_and_reported() {
        let mut record = raw(json!({
            "pool_id_bech32": "pool1bad",
            "pledge": "lots",
            "active_stake": true,
        }));
        let mut diags = Diagnostics::new();
        normalize_record(&mut record, &AMOUNT_FIELDS, &mut diags);

        assert_eq!(record.get("pledge"), Some(&json!("lots")));
        assert_eq!(record.get("active_stake"), Some(&json!(true)));
        assert_eq!(diags.field_conversions(), 2);

        let first = diags.iter().next().unwrap();
        assert_eq!(
            first,
            &Diagnostic::FieldConversion {
                id: Some("pool1bad".into()),
                field: "pledge".into(),
                value: json!("lots"),
            }
        );
    }

    #[test]
    fn missing_and_null_fields_are_ignored() {
        let mut record = raw(json!({ "pledge": null }));
        let mut diags = Diagnostics::new();
        normalize_record(&mut record, &AMOUNT_FIELDS, &mut diags);

        assert_eq!(record.get("pledge"), Some(&Value::Null));
        assert!(record.get("active_stake").is_none());
        assert!(diags.is_empty());
    }

    #[test]
    fn integer_string_forms() {
        assert_eq!(parse_integer_str(" 42 "), Some(42));
        assert_eq!(parse_integer_str("-7000000"), Some(-7_000_000));
        assert_eq!(parse_integer_str("1_000_000"), Some(1_000_000));
        assert_eq!(parse_integer_str("1.5"), None);
        assert_eq!(parse_integer_str(""), None);
        assert_eq!(parse_integer_str("+-1"), None);
        assert_eq!(parse_integer_str("_1"), None);
        assert_eq!(parse_integer_str("1__0"), None);
    }

    #[test]
    fn large_registry_amounts_fit() {
        let mut record = raw(json!({ "active_stake": "45000000000000000" }));
        normalize_all(std::slice::from_mut(&mut record), &mut Diagnostics::new());
        assert_eq!(record.get("active_stake"), Some(&json!(45_000_000_000i64)));
    }
}
