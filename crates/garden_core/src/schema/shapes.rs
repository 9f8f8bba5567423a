//! Historical document shapes and their single-step upgrades.
//!
//! # Responsibility
//! - Describe every schema version older than the current one.
//! - Upgrade each shape to the next version without dropping user data.
//!
//! # Invariants
//! - Each `upgrade` is pure and deterministic.
//! - Plants keep every stored field; only missing ones take defaults.

use crate::ids::{ParcelId, PlantId};
use crate::model::garden::{
    Cell, CellEvent, GardenDocument, Parcel, DEFAULT_COLS, DEFAULT_ROWS, FIRST_PARCEL_NAME,
};
use crate::model::lenient;
use crate::model::plant::Plant;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Coordinates given to upgraded parcels when the document never stored any.
pub const FALLBACK_LOCATION: (f64, f64) = (48.8566, 2.3522);

/// Id of the parcel created from the legacy single grid.
pub const LEGACY_PARCEL_ID: &str = "legacy-grid";

/// Document-level location kept by versions 1 to 3.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct LegacyWeather {
    #[serde(deserialize_with = "lenient::coordinate")]
    pub lat: Option<f64>,
    #[serde(deserialize_with = "lenient::coordinate")]
    pub lon: Option<f64>,
}

impl LegacyWeather {
    fn location(&self) -> Option<(f64, f64)> {
        Some((self.lat?, self.lon?))
    }
}

/// Cell of the unversioned single-grid store.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyCell {
    #[serde(deserialize_with = "lenient::reference")]
    pub plant_id: Option<PlantId>,
}

/// Version 1: unversioned app state with one grid.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyDocument {
    #[serde(deserialize_with = "lenient::size")]
    pub rows: usize,
    #[serde(deserialize_with = "lenient::size")]
    pub cols: usize,
    #[serde(deserialize_with = "lenient::records")]
    pub plants: IndexMap<PlantId, Plant>,
    #[serde(deserialize_with = "lenient::grid")]
    pub grid: Vec<Vec<LegacyCell>>,
    #[serde(deserialize_with = "lenient::entry")]
    pub weather: Option<LegacyWeather>,
}

impl LegacyDocument {
    /// Wraps the single grid into one parcel.
    pub fn upgrade(self) -> DocumentV2 {
        let rows = match self.rows {
            0 if self.grid.is_empty() => DEFAULT_ROWS,
            0 => self.grid.len(),
            rows => rows,
        };
        let cols = match self.cols {
            0 => self
                .grid
                .iter()
                .map(Vec::len)
                .max()
                .filter(|width| *width > 0)
                .unwrap_or(DEFAULT_COLS),
            cols => cols,
        };
        let grid = self
            .grid
            .into_iter()
            .map(|cells| {
                cells
                    .into_iter()
                    .map(|cell| CellV2 {
                        plant_id: cell.plant_id,
                        layers: BTreeMap::new(),
                        history: Vec::new(),
                    })
                    .collect()
            })
            .collect();

        let parcel = ParcelV2 {
            id: LEGACY_PARCEL_ID.to_string(),
            name: FIRST_PARCEL_NAME.to_string(),
            rows,
            cols,
            grid,
        };
        let mut parcels = IndexMap::new();
        parcels.insert(LEGACY_PARCEL_ID.to_string(), parcel);

        DocumentV2 {
            plants: self.plants,
            parcels,
            current_parcel_id: LEGACY_PARCEL_ID.to_string(),
            weather: self.weather,
        }
    }
}

/// Version 2 cell: content plus layer flags.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CellV2 {
    #[serde(deserialize_with = "lenient::reference")]
    pub plant_id: Option<PlantId>,
    #[serde(deserialize_with = "lenient::flags")]
    pub layers: BTreeMap<String, bool>,
    /// Not part of the version 2 format; kept when a store wrote it early.
    #[serde(deserialize_with = "lenient::list")]
    pub history: Vec<CellEvent>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParcelV2 {
    #[serde(deserialize_with = "lenient::text")]
    pub id: ParcelId,
    #[serde(deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(deserialize_with = "lenient::size")]
    pub rows: usize,
    #[serde(deserialize_with = "lenient::size")]
    pub cols: usize,
    #[serde(deserialize_with = "lenient::grid")]
    pub grid: Vec<Vec<CellV2>>,
}

/// Version 2: several parcels, cells with layers, no history.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentV2 {
    #[serde(deserialize_with = "lenient::records")]
    pub plants: IndexMap<PlantId, Plant>,
    #[serde(deserialize_with = "lenient::records")]
    pub parcels: IndexMap<ParcelId, ParcelV2>,
    #[serde(deserialize_with = "lenient::text")]
    pub current_parcel_id: ParcelId,
    #[serde(deserialize_with = "lenient::entry")]
    pub weather: Option<LegacyWeather>,
}

impl DocumentV2 {
    /// Gives every cell a history, seeding occupied cells with one planting
    /// event dated from the plant record.
    pub fn upgrade(self) -> DocumentV3 {
        let plants = self.plants;
        let parcels = self
            .parcels
            .into_iter()
            .map(|(key, parcel)| {
                let grid = parcel
                    .grid
                    .into_iter()
                    .map(|cells| {
                        cells
                            .into_iter()
                            .map(|cell| seed_history(cell, &plants))
                            .collect()
                    })
                    .collect();
                let upgraded = ParcelV3 {
                    id: parcel.id,
                    name: parcel.name,
                    rows: parcel.rows,
                    cols: parcel.cols,
                    lat: None,
                    lon: None,
                    grid,
                };
                (key, upgraded)
            })
            .collect();

        DocumentV3 {
            plants,
            parcels,
            current_parcel_id: self.current_parcel_id,
            weather: self.weather,
        }
    }
}

fn seed_history(cell: CellV2, plants: &IndexMap<PlantId, Plant>) -> Cell {
    if !cell.history.is_empty() {
        return Cell {
            plant_id: cell.plant_id,
            layers: cell.layers,
            history: cell.history,
        };
    }
    let Some(plant_id) = cell.plant_id else {
        return Cell {
            plant_id: None,
            layers: cell.layers,
            history: Vec::new(),
        };
    };
    let planted_at = plants.get(&plant_id).and_then(|plant| plant.planted_at);
    let mut seeded = Cell::planted(plant_id, planted_at);
    seeded.layers = cell.layers;
    seeded
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParcelV3 {
    #[serde(deserialize_with = "lenient::text")]
    pub id: ParcelId,
    #[serde(deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(deserialize_with = "lenient::size")]
    pub rows: usize,
    #[serde(deserialize_with = "lenient::size")]
    pub cols: usize,
    /// Not part of the version 3 format; kept when already present.
    #[serde(deserialize_with = "lenient::coordinate")]
    pub lat: Option<f64>,
    #[serde(deserialize_with = "lenient::coordinate")]
    pub lon: Option<f64>,
    #[serde(deserialize_with = "lenient::grid")]
    pub grid: Vec<Vec<Cell>>,
}

/// Version 3: cells carry provenance history; location is document-wide.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentV3 {
    #[serde(deserialize_with = "lenient::records")]
    pub plants: IndexMap<PlantId, Plant>,
    #[serde(deserialize_with = "lenient::records")]
    pub parcels: IndexMap<ParcelId, ParcelV3>,
    #[serde(deserialize_with = "lenient::text")]
    pub current_parcel_id: ParcelId,
    #[serde(deserialize_with = "lenient::entry")]
    pub weather: Option<LegacyWeather>,
}

impl DocumentV3 {
    /// Moves the location onto every parcel and produces a current document.
    pub fn upgrade(self) -> GardenDocument {
        let (lat, lon) = self
            .weather
            .and_then(|weather| weather.location())
            .unwrap_or(FALLBACK_LOCATION);
        let parcels = self
            .parcels
            .into_iter()
            .map(|(key, parcel)| {
                let located = Parcel {
                    id: parcel.id,
                    name: parcel.name,
                    rows: parcel.rows,
                    cols: parcel.cols,
                    lat: Some(parcel.lat.unwrap_or(lat)),
                    lon: Some(parcel.lon.unwrap_or(lon)),
                    grid: parcel.grid,
                };
                (key, located)
            })
            .collect();
        GardenDocument::from_parts(self.plants, parcels, self.current_parcel_id)
    }
}
