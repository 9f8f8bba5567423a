//! Identifier generation for garden entities.
//!
//! # Responsibility
//! - Produce short, printable, opaque tokens for plants, parcels, profiles
//!   and log entries.
//!
//! # Invariants
//! - Tokens are 12 lowercase hex characters (48 random bits).
//! - Tokens carry no ordering; callers must not sort by them.

use uuid::Uuid;

/// Length of every generated identifier.
pub const ID_LEN: usize = 12;

/// Identifier of a plant record.
pub type PlantId = String;
/// Identifier of a parcel (grid plot).
pub type ParcelId = String;
/// Identifier of a profile (isolated garden document).
pub type ProfileId = String;
/// Identifier of a watering, harvest or photo entry.
pub type EntryId = String;

/// Returns a fresh opaque identifier.
pub fn new_id() -> String {
    let mut token = Uuid::new_v4().simple().to_string();
    token.truncate(ID_LEN);
    token
}

#[cfg(test)]
mod tests {
    use super::{new_id, ID_LEN};
    use std::collections::HashSet;

    #[test]
    fn ids_are_short_hex_tokens() {
        let id = new_id();
        assert_eq!(id.len(), ID_LEN);
        assert!(id.chars().all(|ch| ch.is_ascii_hexdigit() && !ch.is_ascii_uppercase()));
    }

    #[test]
    fn ids_do_not_collide_at_document_scale() {
        let ids: HashSet<String> = (0..20_000).map(|_| new_id()).collect();
        assert_eq!(ids.len(), 20_000);
    }
}
