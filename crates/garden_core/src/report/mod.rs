//! Read-only projections over a garden document.
//!
//! Nothing in this module mutates state or touches storage.

pub mod harvest;
pub mod rotation;
pub mod watering;

use crate::model::garden::Parcel;

pub use harvest::{harvest_by_parcel, harvest_by_variety, HarvestTotal};
pub use rotation::{
    flagged_cells, is_rotation_violation, rotation_history, CellKey, RotationEntry,
    RotationReport,
};
pub use watering::{
    watering_suggestions, WateringSuggestion, MIN_DAYS_SINCE_WATERING, RAIN_THRESHOLD_MM,
    RAIN_WINDOW_DAYS,
};

/// Cells holding a plant reference, as `(row, col, plant_id)` in row-major
/// order. References are not resolved, so stale ids are included.
pub fn occupied_cells(parcel: &Parcel) -> impl Iterator<Item = (usize, usize, &str)> {
    parcel
        .cells()
        .filter_map(|(row, col, cell)| cell.plant_id.as_deref().map(|id| (row, col, id)))
}
