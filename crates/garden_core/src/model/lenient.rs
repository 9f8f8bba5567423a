//! Tolerant decoding of persisted fields.
//!
//! # Responsibility
//! - Turn loosely-typed stored values (strings, numbers, nulls) into the
//!   typed fields of the garden model without failing the whole document.
//! - Decode collections entry by entry so one bad entry only costs itself.
//! - Coerce malformed numeric input to zero.
//!
//! # Invariants
//! - Every helper is total: unknown shapes map to the field default.
//! - Coerced quantities are finite and never negative.

use chrono::{DateTime, NaiveDate};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

static DATE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d{4})-(\d{1,2})-(\d{1,2})").expect("date prefix pattern is valid")
});

/// Parses a stored date.
///
/// Accepts `YYYY-MM-DD`, any ISO date-time starting with that prefix, and
/// epoch milliseconds. Returns `None` for anything else.
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(text) => parse_date_text(text),
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|v| v.is_finite()).map(|v| v as i64))
            .and_then(DateTime::from_timestamp_millis)
            .map(|instant| instant.date_naive()),
        _ => None,
    }
}

/// Parses a date typed by a user or stored as text.
pub fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let captures = DATE_PREFIX.captures(text)?;
    let year = captures[1].parse::<i32>().ok()?;
    let month = captures[2].parse::<u32>().ok()?;
    let day = captures[3].parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Coerces a stored numeric value to a non-negative finite quantity.
pub fn coerce_quantity(value: &Value) -> f64 {
    match value {
        Value::Number(number) => sanitize_quantity(number.as_f64()),
        Value::String(text) => quantity_from_text(text),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    }
}

/// Parses a quantity typed as text; malformed input yields `0.0`.
pub fn quantity_from_text(text: &str) -> f64 {
    let normalized = text.trim().replace(',', ".");
    sanitize_quantity(normalized.parse::<f64>().ok())
}

/// Clamps an optional quantity to a finite, non-negative value.
pub fn sanitize_quantity(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

fn coordinate_from(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn text_from(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => String::new(),
    }
}

fn reference_from(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn size_from(value: &Value) -> usize {
    let parsed = match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|v| v.is_finite() && *v >= 0.0).map(|v| v as u64)),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.and_then(|v| usize::try_from(v).ok()).unwrap_or(0)
}

fn flag_from(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|v| v != 0.0),
        Value::String(text) => matches!(text.trim(), "true" | "1"),
        _ => false,
    }
}

fn optional_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Value>::deserialize(deserializer)
}

pub(crate) fn date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_value(deserializer)?.as_ref().and_then(parse_date))
}

pub(crate) fn quantity<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_value(deserializer)?
        .as_ref()
        .map_or(0.0, coerce_quantity))
}

pub(crate) fn coordinate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_value(deserializer)?.as_ref().and_then(coordinate_from))
}

pub(crate) fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_value(deserializer)?
        .as_ref()
        .map(text_from)
        .unwrap_or_default())
}

pub(crate) fn reference<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_value(deserializer)?.as_ref().and_then(reference_from))
}

/// Grid dimension; `0` means "unknown" and is resolved by normalization.
pub(crate) fn size<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_value(deserializer)?.as_ref().map_or(0, size_from))
}

pub(crate) fn flags<'de, D>(
    deserializer: D,
) -> Result<std::collections::BTreeMap<String, bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = optional_value(deserializer)?;
    let Some(Value::Object(entries)) = value else {
        return Ok(Default::default());
    };
    Ok(entries
        .iter()
        .map(|(key, raw)| (key.clone(), flag_from(raw)))
        .collect())
}

/// Decodes an optional nested record; unreadable input reads as absent.
pub(crate) fn entry<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(optional_value(deserializer)?
        .filter(|raw| !raw.is_null())
        .and_then(|raw| serde_json::from_value(raw).ok()))
}

/// Decodes a list, dropping `null` entries and entries that do not decode.
pub(crate) fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Some(Value::Array(entries)) = optional_value(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(entries
        .into_iter()
        .filter(|entry| !entry.is_null())
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect())
}

/// Decodes an id-keyed map in stored order, dropping entries that do not
/// decode.
pub(crate) fn records<'de, D, T>(deserializer: D) -> Result<IndexMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Some(Value::Object(entries)) = optional_value(deserializer)? else {
        return Ok(IndexMap::new());
    };
    Ok(entries
        .into_iter()
        .filter_map(|(key, raw)| serde_json::from_value(raw).ok().map(|record| (key, record)))
        .collect())
}

/// Decodes a grid of cells, replacing malformed rows or cells with empty ones.
pub(crate) fn grid<'de, D, T>(deserializer: D) -> Result<Vec<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let Some(Value::Array(rows)) = optional_value(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(rows
        .into_iter()
        .map(|row| match row {
            Value::Array(cells) => cells
                .into_iter()
                .map(|cell| serde_json::from_value::<T>(cell).unwrap_or_default())
                .collect(),
            _ => Vec::new(),
        })
        .collect())
}
