//! Per-cell crop rotation timeline derived from grid history.
//!
//! # Responsibility
//! - Project cell history plus catalog records into one planting per year.
//! - Decide which cells repeat the same crop within the window.
//!
//! # Invariants
//! - Read-only: the document is never mutated.
//! - Dangling plant ids and undatable entries are skipped, never fatal.
//! - Per cell, entries are newest year first and years are unique.

use crate::model::garden::{Cell, EventTime, GardenDocument};
use chrono::Datelike;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Grid coordinate used as report key, rendered as `"r,c"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellKey {
    pub row: usize,
    pub col: usize,
}

impl CellKey {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl Display for CellKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}

impl FromStr for CellKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (row, col) = value
            .split_once(',')
            .ok_or_else(|| format!("cell key must look like `r,c`, got `{value}`"))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<usize>()
                .map_err(|err| format!("invalid cell key `{value}`: {err}"))
        };
        Ok(Self::new(parse(row)?, parse(col)?))
    }
}

impl Serialize for CellKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One year of a cell timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationEntry {
    pub year: i32,
    pub plant_name: String,
}

/// Timeline of every cell of a parcel, keyed in row-major order.
pub type RotationReport = BTreeMap<CellKey, Vec<RotationEntry>>;

/// Builds the rotation timeline of `parcel_id`, keeping at most `years_back`
/// entries per cell.
///
/// Unknown parcels yield an empty report; every cell of a known parcel gets
/// a key, even when its timeline is empty.
pub fn rotation_history(doc: &GardenDocument, parcel_id: &str, years_back: usize) -> RotationReport {
    let Some(parcel) = doc.parcel(parcel_id) else {
        return RotationReport::new();
    };
    parcel
        .cells()
        .map(|(row, col, cell)| (CellKey::new(row, col), cell_timeline(doc, cell, years_back)))
        .collect()
}

fn cell_timeline(doc: &GardenDocument, cell: &Cell, years_back: usize) -> Vec<RotationEntry> {
    let mut timeline: Vec<RotationEntry> = Vec::new();
    for event in &cell.history {
        let Some(plant) = doc.resolve_plant(event.plant_id.as_deref()) else {
            continue;
        };
        // Unreadable timestamps skip the entry; absent ones fall back to the
        // planting date.
        let date = match &event.timestamp {
            EventTime::Dated(date) => Some(*date),
            EventTime::Absent => plant.planted_at,
            EventTime::Garbled(_) => None,
        };
        let Some(year) = date.map(|date| date.year()) else {
            continue;
        };
        // First entry seen for a year wins.
        if timeline.iter().any(|entry| entry.year == year) {
            continue;
        }
        timeline.push(RotationEntry {
            year,
            plant_name: plant.name.clone(),
        });
    }
    timeline.truncate(years_back);
    timeline
}

/// `true` when the most recent crop name occurs more than once in `entries`.
pub fn is_rotation_violation(entries: &[RotationEntry]) -> bool {
    let Some(latest) = entries.first() else {
        return false;
    };
    entries
        .iter()
        .filter(|entry| entry.plant_name == latest.plant_name)
        .count()
        > 1
}

/// Cells whose timeline repeats its latest crop, in row-major order.
pub fn flagged_cells(report: &RotationReport) -> Vec<CellKey> {
    report
        .iter()
        .filter(|(_, entries)| is_rotation_violation(entries))
        .map(|(key, _)| *key)
        .collect()
}
