//! Raw-record normalization.
//!
//! The open-data records arrive as loosely-typed JSON objects whose
//! coordinate fields may be strings or numbers depending on the dataset
//! revision. Normalization makes the leniency explicit: every field is
//! coerced to its string form first, coordinates must then parse to
//! finite numbers, and a record failing either coordinate is skipped —
//! routine filtering, not an error.

use serde_json::Value;
use trash_map_fetcher_models::TrashBin;

use crate::dataset_def::FieldMapping;

/// Coerces a raw field value to its string form. JSON strings pass
/// through unchanged; numbers and booleans use their display form;
/// null, missing, and compound values degrade to the empty string.
fn coerce_scalar(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Parses a coordinate field: coerce to string, parse as `f64`, accept
/// only finite results.
fn parse_coordinate(value: Option<&Value>) -> Option<f64> {
    coerce_scalar(value).parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Converts one raw record into a [`TrashBin`], or `None` when either
/// coordinate is missing or unparseable. Address fragments degrade to
/// empty strings instead of failing the record.
#[must_use]
pub fn create_record(raw: &Value, fields: &FieldMapping) -> Option<TrashBin> {
    let latitude = parse_coordinate(raw.get(&fields.lat))?;
    let longitude = parse_coordinate(raw.get(&fields.lng))?;

    let address = format!(
        "{}{}",
        coerce_scalar(raw.get(&fields.street)),
        coerce_scalar(raw.get(&fields.annotation))
    );

    Some(TrashBin::new(latitude, longitude, address))
}

/// Normalizes an accumulated raw-record list, preserving input order and
/// silently dropping records without valid coordinates.
#[must_use]
pub fn normalize_records(records: &[Value], fields: &FieldMapping) -> Vec<TrashBin> {
    let raw_count = records.len();
    let bins: Vec<TrashBin> = records
        .iter()
        .filter_map(|raw| create_record(raw, fields))
        .collect();

    log::info!("Normalized {} bins from {raw_count} raw records", bins.len());
    bins
}
