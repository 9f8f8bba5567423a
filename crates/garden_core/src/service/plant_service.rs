//! Plant catalog use-cases on the live document.
//!
//! # Invariants
//! - `delete_plant` clears grid references and removes the record in one
//!   in-memory step followed by a single write.
//! - Log entries returned as `None` mean the plant was unknown and nothing
//!   was written.

use crate::ids::{EntryId, PlantId};
use crate::model::plant::{NewHarvest, NewPhoto, NewPlant, NewWatering, PlantPatch};
use crate::repo::kv_repo::KeyValueStore;
use crate::service::garden_service::{GardenResult, GardenService};
use log::info;

impl<S: KeyValueStore> GardenService<S> {
    pub fn add_plant(&mut self, input: NewPlant) -> GardenResult<PlantId> {
        let today = self.today();
        let plant_id = self.document.add_plant(input, today);
        self.save()?;
        info!(
            "event=plant_add module=service status=ok plant_id={} plants={}",
            plant_id,
            self.document.plants().len()
        );
        Ok(plant_id)
    }

    pub fn update_plant(&mut self, plant_id: &str, patch: PlantPatch) -> GardenResult<()> {
        if !self.document.update_plant(plant_id, patch) {
            return self.unknown("plant_update", "plant", plant_id);
        }
        self.commit("plant_update")
    }

    /// Removes a plant and empties every cell that holds it, in every
    /// parcel. Cell history keeps referring to the deleted id.
    pub fn delete_plant(&mut self, plant_id: &str) -> GardenResult<()> {
        let Some(cleared) = self.document.delete_plant(plant_id) else {
            return self.unknown("plant_delete", "plant", plant_id);
        };
        self.save()?;
        info!(
            "event=plant_delete module=service status=ok plant_id={} cleared_cells={}",
            plant_id, cleared
        );
        Ok(())
    }

    pub fn add_watering(
        &mut self,
        plant_id: &str,
        input: NewWatering,
    ) -> GardenResult<Option<EntryId>> {
        let today = self.today();
        match self.document.add_watering(plant_id, input, today) {
            Some(entry_id) => {
                self.commit("watering_add")?;
                Ok(Some(entry_id))
            }
            None => self.unknown("watering_add", "plant", plant_id).map(|_| None),
        }
    }

    pub fn add_harvest(
        &mut self,
        plant_id: &str,
        input: NewHarvest,
    ) -> GardenResult<Option<EntryId>> {
        let today = self.today();
        match self.document.add_harvest(plant_id, input, today) {
            Some(entry_id) => {
                self.commit("harvest_add")?;
                Ok(Some(entry_id))
            }
            None => self.unknown("harvest_add", "plant", plant_id).map(|_| None),
        }
    }

    pub fn add_photo(&mut self, plant_id: &str, input: NewPhoto) -> GardenResult<Option<EntryId>> {
        let today = self.today();
        match self.document.add_photo(plant_id, input, today) {
            Some(entry_id) => {
                self.commit("photo_add")?;
                Ok(Some(entry_id))
            }
            None => self.unknown("photo_add", "plant", plant_id).map(|_| None),
        }
    }

    pub fn remove_photo(&mut self, plant_id: &str, photo_id: &str) -> GardenResult<()> {
        if self.document.plant(plant_id).is_none() {
            return self.unknown("photo_remove", "plant", plant_id);
        }
        if !self.document.remove_photo(plant_id, photo_id) {
            return self.unknown("photo_remove", "photo", photo_id);
        }
        self.commit("photo_remove")
    }
}
