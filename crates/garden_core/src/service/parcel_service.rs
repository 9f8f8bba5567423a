//! Parcel and grid use-cases on the live document.
//!
//! # Invariants
//! - Grid mutations act on the current parcel only.
//! - Out-of-range coordinates are reported, never written.

use crate::ids::ParcelId;
use crate::model::garden::NewParcel;
use crate::repo::kv_repo::KeyValueStore;
use crate::service::garden_service::{GardenResult, GardenService};
use log::info;

impl<S: KeyValueStore> GardenService<S> {
    pub fn set_current_parcel(&mut self, parcel_id: &str) -> GardenResult<()> {
        if !self.document.set_current_parcel(parcel_id) {
            return self.unknown("parcel_select", "parcel", parcel_id);
        }
        self.commit("parcel_select")
    }

    /// Adds an empty parcel and makes it current.
    pub fn add_parcel(&mut self, input: NewParcel) -> GardenResult<ParcelId> {
        let parcel_id = self.document.add_parcel(input);
        self.save()?;
        let parcel = self.document.current_parcel();
        info!(
            "event=parcel_add module=service status=ok parcel_id={} rows={} cols={}",
            parcel_id, parcel.rows, parcel.cols
        );
        Ok(parcel_id)
    }

    /// Removes a parcel; the sole remaining parcel is kept.
    pub fn remove_parcel(&mut self, parcel_id: &str) -> GardenResult<()> {
        if self.document.parcel(parcel_id).is_none() {
            return self.unknown("parcel_remove", "parcel", parcel_id);
        }
        if !self.document.remove_parcel(parcel_id) {
            info!(
                "event=parcel_remove module=service status=noop reason=last_parcel parcel_id={}",
                parcel_id
            );
            return Ok(());
        }
        self.save()?;
        info!(
            "event=parcel_remove module=service status=ok parcel_id={} parcels={}",
            parcel_id,
            self.document.parcels().len()
        );
        Ok(())
    }

    /// Resizes a parcel grid; sizes are clamped to `1..=MAX_GRID_SIDE`.
    ///
    /// Cells outside the new bounds are dropped together with their history.
    pub fn resize_parcel(&mut self, parcel_id: &str, rows: usize, cols: usize) -> GardenResult<()> {
        if !self.document.resize_parcel(parcel_id, rows, cols) {
            return self.unknown("parcel_resize", "parcel", parcel_id);
        }
        self.save()?;
        if let Some(parcel) = self.document.parcel(parcel_id) {
            info!(
                "event=parcel_resize module=service status=ok parcel_id={} rows={} cols={}",
                parcel_id, parcel.rows, parcel.cols
            );
        }
        Ok(())
    }

    pub fn set_parcel_location(
        &mut self,
        parcel_id: &str,
        lat: Option<f64>,
        lon: Option<f64>,
    ) -> GardenResult<()> {
        if !self.document.set_parcel_location(parcel_id, lat, lon) {
            return self.unknown("parcel_locate", "parcel", parcel_id);
        }
        self.commit("parcel_locate")
    }

    /// Puts `plant_id` in cell `(row, col)` of the current parcel and records
    /// the planting in the cell history.
    pub fn place_plant(&mut self, row: usize, col: usize, plant_id: &str) -> GardenResult<()> {
        if self.document.plant(plant_id).is_none() {
            return self.unknown("cell_place", "plant", plant_id);
        }
        let today = self.today();
        self.document
            .place_plant(row, col, Some(plant_id.to_string()), today)?;
        self.commit("cell_place")
    }

    /// Empties cell `(row, col)` of the current parcel; the clearing is
    /// recorded in the cell history.
    pub fn clear_cell(&mut self, row: usize, col: usize) -> GardenResult<()> {
        let today = self.today();
        self.document.place_plant(row, col, None, today)?;
        self.commit("cell_clear")
    }

    /// Flips a layer flag of cell `(row, col)`; returns the new value.
    pub fn toggle_layer(&mut self, row: usize, col: usize, key: &str) -> GardenResult<bool> {
        let value = self.document.toggle_layer(row, col, key)?;
        self.commit("cell_layer_toggle")?;
        Ok(value)
    }
}
