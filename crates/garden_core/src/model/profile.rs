//! Profile index: named, isolated garden documents.
//!
//! # Invariants
//! - A usable index holds at least one profile.
//! - `current_id` resolves to an entry of `list`.

use crate::ids::{new_id, ProfileId};
use crate::model::lenient;
use serde::{Deserialize, Serialize};

/// Name of the profile created on first access.
pub const DEFAULT_PROFILE_NAME: &str = "Mon jardin";
/// Name used by `add_profile` when the caller passes a blank name.
pub const NEW_PROFILE_NAME: &str = "Nouveau jardin";

/// One isolated garden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, deserialize_with = "lenient::text")]
    pub id: ProfileId,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
}

/// Process-wide list of profiles plus the active one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileIndex {
    #[serde(default, deserialize_with = "lenient::text")]
    pub current_id: ProfileId,
    #[serde(default, deserialize_with = "lenient::list")]
    pub list: Vec<Profile>,
}

impl ProfileIndex {
    /// Creates an index holding a single, current profile.
    pub fn with_single(name: impl Into<String>) -> Self {
        let id = new_id();
        Self {
            current_id: id.clone(),
            list: vec![Profile {
                id,
                name: name.into(),
            }],
        }
    }

    pub fn contains(&self, profile_id: &str) -> bool {
        self.list.iter().any(|profile| profile.id == profile_id)
    }

    pub fn get_mut(&mut self, profile_id: &str) -> Option<&mut Profile> {
        self.list.iter_mut().find(|profile| profile.id == profile_id)
    }

    /// Drops unusable entries and repoints `current_id` when it dangles.
    ///
    /// Returns `false` when nothing usable is left, in which case the index
    /// must be rebuilt.
    pub fn repair(&mut self) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.list
            .retain(|profile| !profile.id.trim().is_empty() && seen.insert(profile.id.clone()));
        let Some(first) = self.list.first() else {
            return false;
        };
        if !self.contains(&self.current_id) {
            self.current_id = first.id.clone();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{Profile, ProfileIndex};
    use serde_json::json;

    #[test]
    fn repair_repoints_dangling_current_id() {
        let mut index = ProfileIndex {
            current_id: "gone".to_string(),
            list: vec![
                Profile {
                    id: "a".to_string(),
                    name: "A".to_string(),
                },
                Profile {
                    id: "a".to_string(),
                    name: "duplicate".to_string(),
                },
            ],
        };
        assert!(index.repair());
        assert_eq!(index.current_id, "a");
        assert_eq!(index.list.len(), 1);
    }

    #[test]
    fn repair_reports_empty_index() {
        let mut index = ProfileIndex {
            current_id: String::new(),
            list: Vec::new(),
        };
        assert!(!index.repair());
    }

    #[test]
    fn malformed_entries_do_not_sink_the_index() {
        let mut index: ProfileIndex = serde_json::from_value(json!({
            "currentId": "b",
            "list": [{"name": "no id"}, null, 12, {"id": "b", "name": "Balcon"}]
        }))
        .unwrap();
        assert!(index.repair());
        assert_eq!(index.current_id, "b");
        assert_eq!(index.list.len(), 1);
        assert_eq!(index.list[0].name, "Balcon");

        let mut empty: ProfileIndex =
            serde_json::from_value(json!({"currentId": "b", "list": null})).unwrap();
        assert!(!empty.repair());
    }
}
