//! Persistent data core of the garden record-keeper.
//! This crate is the single source of truth for document invariants,
//! schema migration and profile isolation.

pub mod config;
pub mod db;
pub mod ids;
pub mod logging;
pub mod model;
pub mod report;
pub mod repo;
pub mod schema;
pub mod service;
pub mod weather;

pub use config::{ConfigError, GardenConfig, UnknownIdPolicy, DEFAULT_ROTATION_YEARS};
pub use ids::{new_id, EntryId, ParcelId, PlantId, ProfileId};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::garden::{
    Cell, CellEvent, CellOutOfRange, EventTime, GardenDocument, NewParcel, Parcel,
    CURRENT_SCHEMA_VERSION, DEFAULT_COLS, DEFAULT_ROWS, MAX_GRID_SIDE,
};
pub use model::plant::{
    Harvest, NewHarvest, NewPhoto, NewPlant, NewWatering, Photo, Plant, PlantPatch, Watering,
};
pub use model::profile::{Profile, ProfileIndex, DEFAULT_PROFILE_NAME};
pub use report::{
    flagged_cells, harvest_by_parcel, harvest_by_variety, is_rotation_violation,
    occupied_cells, rotation_history, watering_suggestions, CellKey, HarvestTotal,
    RotationEntry, RotationReport, WateringSuggestion,
};
pub use repo::kv_repo::{KeyValueStore, RepoError, RepoResult, SqliteKeyValueStore};
pub use repo::memory_repo::MemoryKeyValueStore;
pub use schema::{fresh, migrate, migrate_text, try_migrate_text, VersionedDocument};
pub use service::{
    document_key, unreadable_key, GardenError, GardenResult, GardenService, PROFILE_INDEX_KEY,
};
pub use weather::{RainDay, RainSeries, RainSeriesSource, WeatherError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
