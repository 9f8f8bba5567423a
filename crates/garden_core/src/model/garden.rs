//! Garden document aggregate: parcels, grids and cell provenance.
//!
//! # Responsibility
//! - Own every parcel and plant of one profile.
//! - Provide grid mutations (place, clear, toggle layer, resize) that keep
//!   the aggregate invariants intact.
//!
//! # Invariants
//! - `parcels` is never empty and `current_parcel_id` always keys into it.
//! - Every parcel grid is exactly `rows x cols` with `rows, cols >= 1`.
//!   Sizes chosen by callers are capped at `MAX_GRID_SIDE`; stored grids
//!   keep their size.
//! - Parcels and plants keep insertion order, so "first parcel" is the
//!   oldest remaining one.
//! - Cell history is newest-first and only grows through place/clear.
//! - Cell plant ids are non-owning; stale ids resolve to "empty".
//!
//! # See also
//! - `schema` for the only code path allowed to normalize history.

use crate::ids::{new_id, ParcelId, PlantId};
use crate::model::lenient;
use crate::model::plant::Plant;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Schema version written by this crate.
pub const CURRENT_SCHEMA_VERSION: u32 = 4;
/// Grid height used when a parcel is created without one.
pub const DEFAULT_ROWS: usize = 8;
/// Grid width used when a parcel is created without one.
pub const DEFAULT_COLS: usize = 12;
/// Largest grid side a caller may request; larger requests are clamped.
pub const MAX_GRID_SIDE: usize = 256;
/// Name of the parcel every fresh document starts with.
pub const FIRST_PARCEL_NAME: &str = "Parcelle A";

/// When a cell event happened, as far as the stored record tells.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EventTime {
    /// No timestamp was recorded.
    #[default]
    Absent,
    Dated(NaiveDate),
    /// A stored timestamp that is not a readable date, kept verbatim.
    Garbled(Value),
}

impl EventTime {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Dated(date) => Some(*date),
            Self::Absent | Self::Garbled(_) => None,
        }
    }
}

impl From<Option<NaiveDate>> for EventTime {
    fn from(value: Option<NaiveDate>) -> Self {
        value.map_or(Self::Absent, Self::Dated)
    }
}

impl Serialize for EventTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Absent => serializer.serialize_none(),
            Self::Dated(date) => date.serialize(serializer),
            Self::Garbled(raw) => raw.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for EventTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(match raw {
            None | Some(Value::Null) => Self::Absent,
            Some(Value::String(text)) if text.trim().is_empty() => Self::Absent,
            Some(raw) => match lenient::parse_date(&raw) {
                Some(date) => Self::Dated(date),
                None => Self::Garbled(raw),
            },
        })
    }
}

/// One provenance event of a cell: what was planted (or cleared) and when.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredCellEvent")]
pub struct CellEvent {
    #[serde(rename = "ts")]
    pub timestamp: EventTime,
    pub plant_id: Option<PlantId>,
}

/// Some stores spelled the event time `timestamp`; `ts` wins when both
/// are present.
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StoredCellEvent {
    ts: EventTime,
    timestamp: EventTime,
    #[serde(deserialize_with = "lenient::reference")]
    plant_id: Option<PlantId>,
}

impl From<StoredCellEvent> for CellEvent {
    fn from(value: StoredCellEvent) -> Self {
        let timestamp = match value.ts {
            EventTime::Absent => value.timestamp,
            ts => ts,
        };
        Self {
            timestamp,
            plant_id: value.plant_id,
        }
    }
}

/// One grid position.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Cell {
    #[serde(deserialize_with = "lenient::reference")]
    pub plant_id: Option<PlantId>,
    #[serde(deserialize_with = "lenient::flags")]
    pub layers: BTreeMap<String, bool>,
    /// Newest first.
    #[serde(deserialize_with = "lenient::list")]
    pub history: Vec<CellEvent>,
}

impl Cell {
    /// Creates a cell holding `plant_id` whose history records that planting.
    pub fn planted(plant_id: PlantId, on: Option<NaiveDate>) -> Self {
        Self {
            plant_id: Some(plant_id.clone()),
            layers: BTreeMap::new(),
            history: vec![CellEvent {
                timestamp: on.into(),
                plant_id: Some(plant_id),
            }],
        }
    }

    /// Sets the cell content and prepends the matching history event.
    pub fn record(&mut self, plant_id: Option<PlantId>, on: NaiveDate) {
        self.history.insert(
            0,
            CellEvent {
                timestamp: EventTime::Dated(on),
                plant_id: plant_id.clone(),
            },
        );
        self.plant_id = plant_id;
    }

    /// Returns whether a layer flag is set; absent keys read as `false`.
    pub fn layer(&self, key: &str) -> bool {
        self.layers.get(key).copied().unwrap_or(false)
    }
}

/// A rectangular planting plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parcel {
    #[serde(default, deserialize_with = "lenient::text")]
    pub id: ParcelId,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::size")]
    pub rows: usize,
    #[serde(default, deserialize_with = "lenient::size")]
    pub cols: usize,
    #[serde(default, deserialize_with = "lenient::coordinate")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient::coordinate")]
    pub lon: Option<f64>,
    #[serde(default, deserialize_with = "lenient::grid")]
    pub grid: Vec<Vec<Cell>>,
}

impl Parcel {
    /// Creates a parcel with an empty `rows x cols` grid, each side clamped
    /// to `1..=MAX_GRID_SIDE`.
    pub fn empty(id: ParcelId, name: impl Into<String>, rows: usize, cols: usize) -> Self {
        let mut parcel = Self {
            id,
            name: name.into(),
            rows: clamp_side(rows),
            cols: clamp_side(cols),
            lat: None,
            lon: None,
            grid: Vec::new(),
        };
        parcel.fit_grid();
        parcel
    }

    /// Returns the cell at `(row, col)` when in range.
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.grid.get(row).and_then(|cells| cells.get(col))
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Result<&mut Cell, CellOutOfRange> {
        let (rows, cols) = (self.rows, self.cols);
        self.grid
            .get_mut(row)
            .and_then(|cells| cells.get_mut(col))
            .ok_or(CellOutOfRange {
                row,
                col,
                rows,
                cols,
            })
    }

    /// Iterates `(row, col, cell)` in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, &Cell)> {
        self.grid.iter().enumerate().flat_map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .map(move |(col, cell)| (row, col, cell))
        })
    }

    /// Changes the grid size, keeping every surviving `(row, col)` cell as is.
    ///
    /// Shrinking drops whole cells together with their history.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        self.rows = clamp_side(rows);
        self.cols = clamp_side(cols);
        self.fit_grid();
    }

    fn fit_grid(&mut self) {
        self.rows = self.rows.max(1);
        self.cols = self.cols.max(1);
        let (rows, cols) = (self.rows, self.cols);
        self.grid.truncate(rows);
        self.grid.resize_with(rows, Vec::new);
        for cells in &mut self.grid {
            cells.truncate(cols);
            cells.resize_with(cols, Cell::default);
        }
    }

    /// Restores the shape invariant on a decoded parcel.
    ///
    /// Unknown dimensions are inferred from the stored grid. A stored size
    /// beyond `MAX_GRID_SIDE` is honoured as far as the stored grid backs it;
    /// only the unbacked empty part is capped.
    pub(crate) fn normalize(&mut self, key: &str) {
        self.id = key.to_string();
        let stored_rows = self.grid.len();
        let stored_cols = self.grid.iter().map(Vec::len).max().unwrap_or(0);
        self.rows = stored_side(self.rows, stored_rows);
        self.cols = stored_side(self.cols, stored_cols);
        self.fit_grid();
    }
}

fn clamp_side(side: usize) -> usize {
    side.clamp(1, MAX_GRID_SIDE)
}

fn stored_side(declared: usize, stored: usize) -> usize {
    match declared {
        0 => stored,
        side if side > MAX_GRID_SIDE => side.min(stored.max(MAX_GRID_SIDE)),
        side => side,
    }
}

/// Input for [`GardenDocument::add_parcel`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewParcel {
    pub name: String,
    /// `None` or `0` falls back to [`DEFAULT_ROWS`].
    pub rows: Option<usize>,
    /// `None` or `0` falls back to [`DEFAULT_COLS`].
    pub cols: Option<usize>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Grid coordinates outside the current parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellOutOfRange {
    pub row: usize,
    pub col: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Display for CellOutOfRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cell ({}, {}) is outside the {}x{} grid",
            self.row, self.col, self.rows, self.cols
        )
    }
}

impl Error for CellOutOfRange {}

/// The per-profile aggregate of plants and parcels.
///
/// Decoding always goes through normalization, so a decoded document
/// satisfies every invariant listed in the module docs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredDocument")]
pub struct GardenDocument {
    schema_version: u32,
    pub(crate) plants: IndexMap<PlantId, Plant>,
    pub(crate) parcels: IndexMap<ParcelId, Parcel>,
    current_parcel_id: ParcelId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredDocument {
    #[serde(default, deserialize_with = "lenient::records")]
    plants: IndexMap<PlantId, Plant>,
    #[serde(default, deserialize_with = "lenient::records")]
    parcels: IndexMap<ParcelId, Parcel>,
    #[serde(default, deserialize_with = "lenient::text")]
    current_parcel_id: ParcelId,
}

impl From<StoredDocument> for GardenDocument {
    fn from(value: StoredDocument) -> Self {
        Self::from_parts(value.plants, value.parcels, value.current_parcel_id)
    }
}

impl GardenDocument {
    /// Builds a valid current-version document with one empty parcel and no
    /// plants.
    pub fn fresh() -> Self {
        let parcel_id = new_id();
        let parcel = Parcel::empty(
            parcel_id.clone(),
            FIRST_PARCEL_NAME,
            DEFAULT_ROWS,
            DEFAULT_COLS,
        );
        let mut parcels = IndexMap::new();
        parcels.insert(parcel_id.clone(), parcel);
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            plants: IndexMap::new(),
            parcels,
            current_parcel_id: parcel_id,
        }
    }

    /// Assembles a document from loose parts and restores every invariant.
    pub(crate) fn from_parts(
        plants: IndexMap<PlantId, Plant>,
        parcels: IndexMap<ParcelId, Parcel>,
        current_parcel_id: ParcelId,
    ) -> Self {
        let mut document = Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            plants,
            parcels,
            current_parcel_id,
        };
        document.normalize();
        document
    }

    fn normalize(&mut self) {
        self.schema_version = CURRENT_SCHEMA_VERSION;
        for (key, plant) in &mut self.plants {
            plant.id.clone_from(key);
        }
        for (key, parcel) in &mut self.parcels {
            parcel.normalize(key);
        }
        if self.parcels.is_empty() {
            let fallback = Self::fresh();
            self.parcels = fallback.parcels;
        }
        if !self.parcels.contains_key(&self.current_parcel_id) {
            self.repoint_current_parcel();
        }
    }

    fn repoint_current_parcel(&mut self) {
        if let Some(first) = self.parcels.keys().next() {
            self.current_parcel_id = first.clone();
        }
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// Plants in insertion order.
    pub fn plants(&self) -> &IndexMap<PlantId, Plant> {
        &self.plants
    }

    /// Parcels in insertion order.
    pub fn parcels(&self) -> &IndexMap<ParcelId, Parcel> {
        &self.parcels
    }

    pub fn plant(&self, plant_id: &str) -> Option<&Plant> {
        self.plants.get(plant_id)
    }

    pub fn parcel(&self, parcel_id: &str) -> Option<&Parcel> {
        self.parcels.get(parcel_id)
    }

    pub fn current_parcel_id(&self) -> &str {
        &self.current_parcel_id
    }

    /// Resolves a cell reference; stale or absent ids read as empty.
    pub fn resolve_plant(&self, plant_id: Option<&str>) -> Option<&Plant> {
        plant_id.and_then(|id| self.plants.get(id))
    }

    /// Returns the parcel keyed by the current-parcel pointer.
    pub fn current_parcel(&self) -> &Parcel {
        self.parcels
            .get(&self.current_parcel_id)
            .or_else(|| self.parcels.values().next())
            .expect("garden document always holds at least one parcel")
    }

    fn current_parcel_mut(&mut self) -> &mut Parcel {
        if !self.parcels.contains_key(&self.current_parcel_id) {
            self.repoint_current_parcel();
        }
        self.parcels
            .get_mut(&self.current_parcel_id)
            .expect("garden document always holds at least one parcel")
    }

    /// Switches the current parcel. Returns `false` for unknown ids.
    pub fn set_current_parcel(&mut self, parcel_id: &str) -> bool {
        if !self.parcels.contains_key(parcel_id) {
            return false;
        }
        self.current_parcel_id = parcel_id.to_string();
        true
    }

    /// Adds an empty parcel and makes it current.
    pub fn add_parcel(&mut self, input: NewParcel) -> ParcelId {
        let id = new_id();
        let name = match input.name.trim() {
            "" => format!("Parcelle {}", self.parcels.len() + 1),
            trimmed => trimmed.to_string(),
        };
        let rows = input.rows.filter(|rows| *rows > 0).unwrap_or(DEFAULT_ROWS);
        let cols = input.cols.filter(|cols| *cols > 0).unwrap_or(DEFAULT_COLS);
        let mut parcel = Parcel::empty(id.clone(), name, rows, cols);
        parcel.lat = input.lat.filter(|v| v.is_finite());
        parcel.lon = input.lon.filter(|v| v.is_finite());
        self.parcels.insert(id.clone(), parcel);
        self.current_parcel_id = id.clone();
        id
    }

    /// Removes a parcel unless it is unknown or the only one left.
    ///
    /// Returns `true` when a parcel was removed.
    pub fn remove_parcel(&mut self, parcel_id: &str) -> bool {
        if self.parcels.len() <= 1 || self.parcels.shift_remove(parcel_id).is_none() {
            return false;
        }
        if self.current_parcel_id == parcel_id {
            self.repoint_current_parcel();
        }
        true
    }

    /// Resizes a parcel grid. Returns `false` for unknown ids.
    pub fn resize_parcel(&mut self, parcel_id: &str, rows: usize, cols: usize) -> bool {
        match self.parcels.get_mut(parcel_id) {
            Some(parcel) => {
                parcel.resize(rows, cols);
                true
            }
            None => false,
        }
    }

    /// Overwrites parcel coordinates. Returns `false` for unknown ids.
    pub fn set_parcel_location(&mut self, parcel_id: &str, lat: Option<f64>, lon: Option<f64>) -> bool {
        match self.parcels.get_mut(parcel_id) {
            Some(parcel) => {
                parcel.lat = lat.filter(|v| v.is_finite());
                parcel.lon = lon.filter(|v| v.is_finite());
                true
            }
            None => false,
        }
    }

    /// Sets (or clears, with `None`) a cell of the current parcel and logs
    /// the change in its history.
    pub fn place_plant(
        &mut self,
        row: usize,
        col: usize,
        plant_id: Option<PlantId>,
        on: NaiveDate,
    ) -> Result<(), CellOutOfRange> {
        let cell = self.current_parcel_mut().cell_mut(row, col)?;
        cell.record(plant_id, on);
        Ok(())
    }

    /// Flips a layer flag on a cell of the current parcel; returns the new value.
    pub fn toggle_layer(&mut self, row: usize, col: usize, key: &str) -> Result<bool, CellOutOfRange> {
        let cell = self.current_parcel_mut().cell_mut(row, col)?;
        let flipped = !cell.layer(key);
        cell.layers.insert(key.to_string(), flipped);
        Ok(flipped)
    }
}
