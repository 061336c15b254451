//! Value coercion into the nested JSON attribute tree
//!
//! Writes raw flattened values into a nested tree at their resolved path,
//! creating intermediate objects as needed. Date-like terminal segments
//! accept three literal forms: a `Date(Y,M,D)` spreadsheet literal, an ISO
//! `YYYY-MM-DD` literal, and a numeric spreadsheet serial (days since
//! 1899-12-30, optionally on the 1904 epoch) including fractional-day time.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::{json, Map, Value as JsonValue};
use std::sync::LazyLock;

use super::path::{data_paths, PathConfig};
use crate::{Error, Result};

/// Matches `Date(1917,4,21)` spreadsheet literals as well as plain
/// `1917-05-21` dates (zero padding optional) anywhere in the value.
static DATE_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^Date\(?)?(\d{4})[,\-](\d{1,2})[,\-](\d{1,2})\)?").expect("valid regex")
});

#[derive(Debug, Clone)]
pub struct CoerceConfig {
    /// Terminal path segments treated as dates.
    pub datetime_fields: Vec<String>,
    pub use_1904_epoch: bool,
}

impl Default for CoerceConfig {
    fn default() -> Self {
        Self {
            datetime_fields: vec!["start_date".to_string(), "end_date".to_string()],
            use_1904_epoch: false,
        }
    }
}

impl CoerceConfig {
    pub fn from_search_config(config: &crate::config::SearchConfig) -> Self {
        Self {
            datetime_fields: config.datetime_fields.clone(),
            use_1904_epoch: config.use_1904_epoch,
        }
    }

    fn is_datetime_field(&self, segment: &str) -> bool {
        self.datetime_fields.iter().any(|f| f == segment)
    }
}

/// Write `value` into `data` at `path`, creating intermediate objects.
///
/// An intermediate segment already holding a non-container value is a
/// structural error naming the conflicting path; the caller decides whether
/// to abort or skip that key.
pub fn nested_set(
    data: &mut JsonValue,
    path: &[String],
    value: &JsonValue,
    as_list: bool,
    config: &CoerceConfig,
) -> Result<()> {
    let Some((last, intermediate)) = path.split_last() else {
        return Ok(());
    };

    let mut cursor = data;
    for key in intermediate {
        let map = cursor
            .as_object_mut()
            .ok_or_else(|| Error::StructuralConflict {
                path: path.join("__"),
            })?;
        cursor = map.entry(key.clone()).or_insert_with(|| json!({}));
    }
    let map = cursor
        .as_object_mut()
        .ok_or_else(|| Error::StructuralConflict {
            path: path.join("__"),
        })?;

    let coerced = if as_list {
        coerce_list(last, value)?
    } else {
        coerce_scalar(last, value, config)?
    };
    map.insert(last.clone(), coerced);
    Ok(())
}

fn coerce_scalar(segment: &str, value: &JsonValue, config: &CoerceConfig) -> Result<JsonValue> {
    if value.is_boolean() {
        return Ok(value.clone());
    }
    if is_falsy(value) {
        // Empty string, not null, so repeated merges stay idempotent.
        return Ok(JsonValue::String(String::new()));
    }
    if config.is_datetime_field(segment) {
        return coerce_date(segment, value, config).map(JsonValue::String);
    }
    Ok(value.clone())
}

fn coerce_list(segment: &str, value: &JsonValue) -> Result<JsonValue> {
    if is_falsy(value) {
        return Ok(json!([]));
    }
    let raw = value.as_str().ok_or_else(|| {
        Error::MalformedQuery(format!("cannot split non-string value for \"{}\"", segment))
    })?;
    let items: Vec<JsonValue> = raw
        .split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(|piece| JsonValue::String(piece.to_string()))
        .collect();
    Ok(JsonValue::Array(items))
}

fn coerce_date(segment: &str, value: &JsonValue, config: &CoerceConfig) -> Result<String> {
    if let Some(raw) = value.as_str() {
        if let Some(caps) = DATE_LITERAL.captures(raw) {
            let year: i32 = caps[2].parse().map_err(|_| bad_date(segment, raw))?;
            let month: u32 = caps[3].parse().map_err(|_| bad_date(segment, raw))?;
            let day: u32 = caps[4].parse().map_err(|_| bad_date(segment, raw))?;

            if caps.get(1).is_some() {
                // Spreadsheet Date(Y,M,D) literal. The source convention
                // stores the month 0-based: Date(1917,4,21) is May, not
                // April, so the month is incremented during parsing.
                let date = NaiveDate::from_ymd_opt(year, month + 1, day)
                    .ok_or_else(|| bad_date(segment, raw))?;
                return Ok(isoformat(date.and_hms_opt(0, 0, 0).expect("midnight")));
            }

            let date =
                NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| bad_date(segment, raw))?;
            return Ok(isoformat(date.and_hms_opt(0, 0, 0).expect("midnight")));
        }

        let serial: f64 = raw.trim().parse().map_err(|_| bad_date(segment, raw))?;
        return Ok(isoformat(xldate_to_datetime(
            serial,
            config.use_1904_epoch,
        )));
    }

    let serial = value
        .as_f64()
        .ok_or_else(|| bad_date(segment, &value.to_string()))?;
    Ok(isoformat(xldate_to_datetime(serial, config.use_1904_epoch)))
}

fn bad_date(segment: &str, raw: &str) -> Error {
    Error::MalformedQuery(format!(
        "cannot parse date value \"{}\" for \"{}\"",
        raw, segment
    ))
}

fn is_falsy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Number(n) => n.as_f64() == Some(0.0),
        JsonValue::Array(a) => a.is_empty(),
        JsonValue::Object(o) => o.is_empty(),
        JsonValue::Bool(_) => false,
    }
}

/// Convert a spreadsheet serial date to a timestamp, including the
/// fractional-day time of day. `use_1904_epoch` shifts by the 1462 days
/// separating the two spreadsheet epochs.
fn xldate_to_datetime(serial: f64, use_1904_epoch: bool) -> NaiveDateTime {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)
        .expect("valid epoch")
        .and_hms_opt(0, 0, 0)
        .expect("midnight");
    let days = serial + if use_1904_epoch { 1462.0 } else { 0.0 };
    let micros = (days * 86_400_000_000f64).round() as i64;
    epoch + Duration::microseconds(micros)
}

/// Render a timestamp the way the stored data expects: seconds precision,
/// with a 6-digit fraction only when the time of day carries one.
fn isoformat(dt: NaiveDateTime) -> String {
    if dt.and_utc().timestamp_subsec_micros() == 0 {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

/// Rebuild the nested structure implied by a flat map of delimiter-joined
/// keys: resolve each key, coerce its value, merge into one tree.
pub fn expand_flattened(
    flat: &Map<String, JsonValue>,
    path_config: &PathConfig,
    coerce_config: &CoerceConfig,
) -> Result<JsonValue> {
    let mut tree = json!({});
    let paths = data_paths(flat.keys().map(String::as_str), path_config);
    for path in &paths {
        nested_set(
            &mut tree,
            &path.segments,
            &flat[&path.key],
            path.is_list,
            coerce_config,
        )?;
    }
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn expand(value: JsonValue) -> Result<JsonValue> {
        expand_flattened(
            value.as_object().unwrap(),
            &PathConfig::default(),
            &CoerceConfig::default(),
        )
    }

    #[test]
    fn merges_language_variants_under_one_key() {
        let tree = expand(json!({
            "data__title__fr_FR": "un joli titre",
            "data__title__en_GB": "A nicer title",
        }))
        .unwrap();

        assert_eq!(tree["data"]["title"]["fr_FR"], "un joli titre");
        assert_eq!(tree["data"]["title"]["en_GB"], "A nicer title");
    }

    #[test]
    fn parses_all_supported_date_literal_forms() {
        let config = CoerceConfig {
            datetime_fields: vec![
                "start_date".into(),
                "end_date".into(),
                "peak_date".into(),
                "digit_date".into(),
                "digit_date_as_string".into(),
                "digit_date_as_float".into(),
            ],
            use_1904_epoch: false,
        };
        let flat = json!({
            "data__title__fr_FR": "un très joli titre",
            "data__start_date": "1917-05-21",
            "data__end_date": "Date(1917,4,21)",
            "data__peak_date": "1917-05-21",
            "data__excel__digit_date": 43411,
            "data__excel__digit_date_as_string": "43411",
            "data__excel__digit_date_as_float": 43411.322,
        });
        let tree =
            expand_flattened(flat.as_object().unwrap(), &PathConfig::default(), &config).unwrap();

        assert_eq!(tree["data"]["title"]["fr_FR"], "un très joli titre");
        assert_eq!(tree["data"]["start_date"], "1917-05-21T00:00:00");
        // Date(1917,4,21): month 4 is May in the spreadsheet convention.
        assert_eq!(tree["data"]["end_date"], "1917-05-21T00:00:00");
        assert_eq!(tree["data"]["peak_date"], "1917-05-21T00:00:00");
        assert_eq!(tree["data"]["excel"]["digit_date"], "2018-11-07T00:00:00");
        assert_eq!(
            tree["data"]["excel"]["digit_date_as_string"],
            "2018-11-07T00:00:00"
        );
        assert_eq!(
            tree["data"]["excel"]["digit_date_as_float"],
            "2018-11-07T07:43:40.800000"
        );
    }

    #[test]
    fn date_coercion_is_idempotent() {
        let first = expand(json!({"data__start_date": "1917-05-21"})).unwrap();
        let again = expand(json!({
            "data__start_date": first["data"]["start_date"].clone()
        }))
        .unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn booleans_pass_through_and_falsy_becomes_empty_string() {
        let tree = expand(json!({
            "data__download": false,
            "data__note": "",
            "data__year": 0,
            "data__missing": null,
        }))
        .unwrap();

        assert_eq!(tree["data"]["download"], json!(false));
        assert_eq!(tree["data"]["note"], "");
        assert_eq!(tree["data"]["year"], "");
        assert_eq!(tree["data"]["missing"], "");
    }

    #[test]
    fn list_values_split_trim_and_drop_empties() {
        let tree = expand(json!({"data__links|list": " a, b ,, c "})).unwrap();
        assert_eq!(tree["data"]["links"], json!(["a", "b", "c"]));

        let empty = expand(json!({"data__links|list": ""})).unwrap();
        assert_eq!(empty["data"]["links"], json!([]));
    }

    #[test]
    fn conflicting_scalar_on_the_path_is_a_structural_error() {
        let mut tree = json!({"data": {"title": "plain"}});
        let err = nested_set(
            &mut tree,
            &[
                "data".to_string(),
                "title".to_string(),
                "fr_FR".to_string(),
            ],
            &json!("un joli titre"),
            false,
            &CoerceConfig::default(),
        )
        .unwrap_err();

        match err {
            Error::StructuralConflict { path } => assert_eq!(path, "data__title__fr_FR"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unparseable_date_is_a_malformed_query() {
        let err = expand(json!({"data__start_date": "not a date"})).unwrap_err();
        assert!(matches!(err, Error::MalformedQuery(_)));
    }
}
