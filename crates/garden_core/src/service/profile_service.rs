//! Profile registry use-cases.
//!
//! # Invariants
//! - The index never drops below one profile.
//! - Switching profiles replaces the live document; only one is held.

use crate::ids::{new_id, ProfileId};
use crate::model::garden::GardenDocument;
use crate::model::profile::{Profile, NEW_PROFILE_NAME};
use crate::repo::kv_repo::KeyValueStore;
use crate::service::garden_service::{
    document_key, load_document, persist_document, unreadable_key, GardenResult, GardenService,
};
use log::info;

impl<S: KeyValueStore> GardenService<S> {
    /// Profiles in insertion order.
    pub fn list_profiles(&self) -> &[Profile] {
        &self.index.list
    }

    /// Creates a profile with a fresh document and switches to it.
    pub fn add_profile(&mut self, name: &str) -> GardenResult<ProfileId> {
        let id = new_id();
        let name = match name.trim() {
            "" => NEW_PROFILE_NAME.to_string(),
            trimmed => trimmed.to_string(),
        };
        let document = GardenDocument::fresh();
        persist_document(&mut self.store, &id, &document)?;

        self.index.list.push(Profile {
            id: id.clone(),
            name,
        });
        self.index.current_id = id.clone();
        self.persist_index()?;
        self.document = document;

        info!(
            "event=profile_add module=service status=ok profile_id={} profiles={}",
            id,
            self.index.list.len()
        );
        Ok(id)
    }

    pub fn rename_profile(&mut self, profile_id: &str, name: &str) -> GardenResult<()> {
        if !self.index.contains(profile_id) {
            return self.unknown("profile_rename", "profile", profile_id);
        }
        if let Some(profile) = self.index.get_mut(profile_id) {
            profile.name = name.trim().to_string();
        }
        self.persist_index()?;
        info!(
            "event=profile_rename module=service status=ok profile_id={}",
            profile_id
        );
        Ok(())
    }

    /// Deletes a profile and its stored document.
    ///
    /// The last remaining profile is never removed. Removing the current
    /// profile loads the first remaining one.
    pub fn remove_profile(&mut self, profile_id: &str) -> GardenResult<()> {
        if !self.index.contains(profile_id) {
            return self.unknown("profile_remove", "profile", profile_id);
        }
        if self.index.list.len() <= 1 {
            info!(
                "event=profile_remove module=service status=noop reason=last_profile profile_id={}",
                profile_id
            );
            return Ok(());
        }

        self.index.list.retain(|profile| profile.id != profile_id);
        let was_current = self.index.current_id == profile_id;
        if was_current {
            if let Some(first) = self.index.list.first() {
                self.index.current_id = first.id.clone();
            }
        }
        self.persist_index()?;
        let key = document_key(profile_id);
        self.store.remove(&key)?;
        self.store.remove(&unreadable_key(&key))?;
        if was_current {
            self.document = load_document(&mut self.store, &self.index.current_id)?;
        }

        info!(
            "event=profile_remove module=service status=ok profile_id={} was_current={} profiles={}",
            profile_id,
            was_current,
            self.index.list.len()
        );
        Ok(())
    }

    /// Switches to another profile, loading (and migrating) its document.
    pub fn set_current_profile(&mut self, profile_id: &str) -> GardenResult<()> {
        if !self.index.contains(profile_id) {
            return self.unknown("profile_switch", "profile", profile_id);
        }
        let document = load_document(&mut self.store, profile_id)?;
        self.index.current_id = profile_id.to_string();
        self.persist_index()?;
        self.document = document;

        info!(
            "event=profile_switch module=service status=ok profile_id={} parcels={} plants={}",
            profile_id,
            self.document.parcels().len(),
            self.document.plants().len()
        );
        Ok(())
    }
}
