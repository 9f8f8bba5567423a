//! Watering reminders driven by recent rainfall.
//!
//! # Invariants
//! - When the last [`RAIN_WINDOW_DAYS`] observed days brought at least
//!   [`RAIN_THRESHOLD_MM`], nothing is suggested.
//! - Otherwise a plant is suggested when it was never watered or last
//!   watered more than [`MIN_DAYS_SINCE_WATERING`] days before `today`.

use crate::ids::PlantId;
use crate::model::garden::GardenDocument;
use crate::weather::RainSeries;
use chrono::NaiveDate;
use serde::Serialize;

/// Observed days summed to decide whether rain did the watering.
pub const RAIN_WINDOW_DAYS: usize = 3;
/// Rain (mm) over the window below which watering is suggested.
pub const RAIN_THRESHOLD_MM: f64 = 5.0;
/// Days a plant may go without watering before it is suggested.
pub const MIN_DAYS_SINCE_WATERING: i64 = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WateringSuggestion {
    pub plant_id: PlantId,
    pub last_watered_on: Option<NaiveDate>,
    pub recent_rain_mm: f64,
}

/// Plants that should be watered on `today`, in catalog order.
pub fn watering_suggestions(
    doc: &GardenDocument,
    rain: &RainSeries,
    today: NaiveDate,
) -> Vec<WateringSuggestion> {
    let recent_rain_mm = rain.recent_total(RAIN_WINDOW_DAYS);
    if recent_rain_mm >= RAIN_THRESHOLD_MM {
        return Vec::new();
    }
    doc.plants()
        .values()
        .filter_map(|plant| {
            let last_watered_on = plant.last_watered_on();
            let due = match last_watered_on {
                Some(date) => (today - date).num_days() > MIN_DAYS_SINCE_WATERING,
                None => true,
            };
            due.then(|| WateringSuggestion {
                plant_id: plant.id.clone(),
                last_watered_on,
                recent_rain_mm,
            })
        })
        .collect()
}
