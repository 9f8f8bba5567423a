//! Plant catalog records and their append-only logs.
//!
//! # Responsibility
//! - Define the plant record and its watering, harvest and photo entries.
//! - Provide catalog mutations on [`GardenDocument`].
//!
//! # Invariants
//! - `photos`, `waterings` and `harvests` are newest-first.
//! - Every log entry carries its own identifier.
//! - Deleting a plant clears every grid reference to it but never rewrites
//!   cell history.

use crate::ids::{new_id, EntryId, PlantId};
use crate::model::garden::GardenDocument;
use crate::model::lenient;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Name given to plants created with a blank name.
pub const DEFAULT_PLANT_NAME: &str = "Plant";
/// Glyph given to plants created without an emoji.
pub const DEFAULT_PLANT_EMOJI: &str = "🌱";

/// One plant in the catalog.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Plant {
    #[serde(deserialize_with = "lenient::text")]
    pub id: PlantId,
    #[serde(deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(deserialize_with = "lenient::text")]
    pub variety: String,
    #[serde(deserialize_with = "lenient::text")]
    pub emoji: String,
    #[serde(deserialize_with = "lenient::text")]
    pub icon_url: String,
    /// `None` only for legacy records whose planting date was lost.
    #[serde(deserialize_with = "lenient::date")]
    pub planted_at: Option<NaiveDate>,
    #[serde(deserialize_with = "lenient::text")]
    pub notes: String,
    #[serde(deserialize_with = "lenient::list")]
    pub photos: Vec<Photo>,
    #[serde(deserialize_with = "lenient::list")]
    pub waterings: Vec<Watering>,
    #[serde(deserialize_with = "lenient::list")]
    pub harvests: Vec<Harvest>,
}

impl Plant {
    /// Returns the "name – variety" label used by reports.
    pub fn label(&self) -> String {
        if self.variety.trim().is_empty() {
            self.name.clone()
        } else {
            format!("{} – {}", self.name, self.variety)
        }
    }

    /// Total harvested weight in kilograms.
    pub fn harvested_weight_kg(&self) -> f64 {
        self.harvests.iter().map(|harvest| harvest.weight_kg).sum()
    }

    /// Date of the most recent dated watering, whatever the list order.
    pub fn last_watered_on(&self) -> Option<NaiveDate> {
        self.waterings.iter().filter_map(|entry| entry.date).max()
    }
}

/// One watering log entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Watering {
    #[serde(deserialize_with = "lenient::text")]
    pub id: EntryId,
    #[serde(deserialize_with = "lenient::date")]
    pub date: Option<NaiveDate>,
    #[serde(deserialize_with = "lenient::quantity")]
    pub amount_l: f64,
    #[serde(deserialize_with = "lenient::text")]
    pub notes: String,
}

/// One harvest log entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Harvest {
    #[serde(deserialize_with = "lenient::text")]
    pub id: EntryId,
    #[serde(deserialize_with = "lenient::date")]
    pub date: Option<NaiveDate>,
    #[serde(deserialize_with = "lenient::quantity")]
    pub qty: f64,
    #[serde(deserialize_with = "lenient::quantity")]
    pub weight_kg: f64,
    #[serde(deserialize_with = "lenient::text")]
    pub notes: String,
}

/// One photo attached to a plant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredPhoto")]
pub struct Photo {
    pub id: EntryId,
    pub url: String,
    pub caption: String,
    pub date: Option<NaiveDate>,
}

/// Older stores kept the photo date as epoch milliseconds under `ts`;
/// `date` wins when both are present.
#[derive(Default, Deserialize)]
#[serde(default)]
struct StoredPhoto {
    #[serde(deserialize_with = "lenient::text")]
    id: EntryId,
    #[serde(deserialize_with = "lenient::text")]
    url: String,
    #[serde(deserialize_with = "lenient::text")]
    caption: String,
    #[serde(deserialize_with = "lenient::date")]
    date: Option<NaiveDate>,
    #[serde(deserialize_with = "lenient::date")]
    ts: Option<NaiveDate>,
}

impl From<StoredPhoto> for Photo {
    fn from(value: StoredPhoto) -> Self {
        Self {
            id: value.id,
            url: value.url,
            caption: value.caption,
            date: value.date.or(value.ts),
        }
    }
}

/// Input for [`GardenDocument::add_plant`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPlant {
    pub name: String,
    pub variety: String,
    pub emoji: String,
    pub icon_url: String,
    pub planted_at: Option<NaiveDate>,
    pub notes: String,
}

impl NewPlant {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Shallow patch for [`GardenDocument::update_plant`]; `None` keeps the field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlantPatch {
    pub name: Option<String>,
    pub variety: Option<String>,
    pub emoji: Option<String>,
    pub icon_url: Option<String>,
    pub planted_at: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Input for a watering entry. Amounts are coerced, never rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewWatering {
    pub date: Option<NaiveDate>,
    pub amount_l: Option<f64>,
    pub notes: String,
}

/// Input for a harvest entry. Quantities are coerced, never rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewHarvest {
    pub date: Option<NaiveDate>,
    pub qty: Option<f64>,
    pub weight_kg: Option<f64>,
    pub notes: String,
}

/// Input for a photo entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPhoto {
    pub url: String,
    pub caption: String,
    pub date: Option<NaiveDate>,
}

fn or_default(value: &str, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

impl GardenDocument {
    /// Adds a plant with trimmed and defaulted fields and empty logs.
    pub fn add_plant(&mut self, input: NewPlant, today: NaiveDate) -> PlantId {
        let id = new_id();
        let plant = Plant {
            id: id.clone(),
            name: or_default(&input.name, DEFAULT_PLANT_NAME),
            variety: input.variety.trim().to_string(),
            emoji: or_default(&input.emoji, DEFAULT_PLANT_EMOJI),
            icon_url: input.icon_url.trim().to_string(),
            planted_at: Some(input.planted_at.unwrap_or(today)),
            notes: input.notes,
            photos: Vec::new(),
            waterings: Vec::new(),
            harvests: Vec::new(),
        };
        self.plants.insert(id.clone(), plant);
        id
    }

    /// Merges `patch` into an existing plant. Returns `false` for unknown ids.
    pub fn update_plant(&mut self, plant_id: &str, patch: PlantPatch) -> bool {
        let Some(plant) = self.plants.get_mut(plant_id) else {
            return false;
        };
        if let Some(name) = patch.name {
            plant.name = name;
        }
        if let Some(variety) = patch.variety {
            plant.variety = variety;
        }
        if let Some(emoji) = patch.emoji {
            plant.emoji = emoji;
        }
        if let Some(icon_url) = patch.icon_url {
            plant.icon_url = icon_url;
        }
        if let Some(planted_at) = patch.planted_at {
            plant.planted_at = Some(planted_at);
        }
        if let Some(notes) = patch.notes {
            plant.notes = notes;
        }
        true
    }

    /// Removes a plant and clears every cell that currently points at it.
    ///
    /// Returns the number of cells cleared, or `None` when the id is unknown.
    /// Cell history keeps the old id.
    pub fn delete_plant(&mut self, plant_id: &str) -> Option<usize> {
        self.plants.shift_remove(plant_id)?;
        let mut cleared = 0;
        for parcel in self.parcels.values_mut() {
            for cell in parcel.grid.iter_mut().flatten() {
                if cell.plant_id.as_deref() == Some(plant_id) {
                    cell.plant_id = None;
                    cleared += 1;
                }
            }
        }
        Some(cleared)
    }

    /// Prepends a watering entry. Returns `None` for unknown plants.
    pub fn add_watering(
        &mut self,
        plant_id: &str,
        input: NewWatering,
        today: NaiveDate,
    ) -> Option<EntryId> {
        let plant = self.plants.get_mut(plant_id)?;
        let id = new_id();
        plant.waterings.insert(
            0,
            Watering {
                id: id.clone(),
                date: Some(input.date.unwrap_or(today)),
                amount_l: lenient::sanitize_quantity(input.amount_l),
                notes: input.notes,
            },
        );
        Some(id)
    }

    /// Prepends a harvest entry. Returns `None` for unknown plants.
    pub fn add_harvest(
        &mut self,
        plant_id: &str,
        input: NewHarvest,
        today: NaiveDate,
    ) -> Option<EntryId> {
        let plant = self.plants.get_mut(plant_id)?;
        let id = new_id();
        plant.harvests.insert(
            0,
            Harvest {
                id: id.clone(),
                date: Some(input.date.unwrap_or(today)),
                qty: lenient::sanitize_quantity(input.qty),
                weight_kg: lenient::sanitize_quantity(input.weight_kg),
                notes: input.notes,
            },
        );
        Some(id)
    }

    /// Prepends a photo entry. Returns `None` for unknown plants.
    pub fn add_photo(
        &mut self,
        plant_id: &str,
        input: NewPhoto,
        today: NaiveDate,
    ) -> Option<EntryId> {
        let plant = self.plants.get_mut(plant_id)?;
        let id = new_id();
        plant.photos.insert(
            0,
            Photo {
                id: id.clone(),
                url: input.url,
                caption: input.caption,
                date: Some(input.date.unwrap_or(today)),
            },
        );
        Some(id)
    }

    /// Removes one photo. Returns `false` when plant or photo is unknown.
    pub fn remove_photo(&mut self, plant_id: &str, photo_id: &str) -> bool {
        let Some(plant) = self.plants.get_mut(plant_id) else {
            return false;
        };
        let before = plant.photos.len();
        plant.photos.retain(|photo| photo.id != photo_id);
        plant.photos.len() != before
    }
}
