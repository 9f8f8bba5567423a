//! Document schema migration engine.
//!
//! # Responsibility
//! - Recognize the schema version of any stored garden document.
//! - Upgrade it one version at a time until it reaches the current shape.
//! - Fall back to a fresh document for absent or unusable input.
//!
//! # Invariants
//! - [`migrate`] is total: it never fails and never panics on input shape.
//! - [`migrate`] is idempotent on its own serialized output.
//! - Upgrades never drop plants, parcels, cells, layers or history.
//!
//! # See also
//! - `shapes` for the per-version document layouts.

pub mod shapes;

use crate::model::garden::{GardenDocument, CURRENT_SCHEMA_VERSION};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
pub use shapes::{
    DocumentV2, DocumentV3, LegacyDocument, FALLBACK_LOCATION, LEGACY_PARCEL_ID,
};

/// A stored document tagged with the schema version it was written in.
#[derive(Debug, Clone, PartialEq)]
pub enum VersionedDocument {
    /// Unversioned single-grid state.
    V1(LegacyDocument),
    V2(DocumentV2),
    V3(DocumentV3),
    /// Current shape.
    V4(GardenDocument),
}

impl VersionedDocument {
    pub fn version(&self) -> u32 {
        match self {
            Self::V1(_) => 1,
            Self::V2(_) => 2,
            Self::V3(_) => 3,
            Self::V4(_) => CURRENT_SCHEMA_VERSION,
        }
    }

    /// Recognizes and decodes a stored value.
    ///
    /// Returns `None` for anything that is not a garden document: non-objects,
    /// version `0`, objects without any garden field, and shapes that do not
    /// decode. Versions newer than the current one are read as current.
    pub fn decode(raw: &Value) -> Option<Self> {
        let object = raw.as_object()?;
        let version = object
            .get("schemaVersion")
            .or_else(|| object.get("version"))
            .and_then(version_number);

        match version {
            None if looks_like_legacy(object) => decode_as(raw).map(Self::V1),
            None => None,
            Some(1) => decode_as(raw).map(Self::V1),
            Some(2) => decode_as(raw).map(Self::V2),
            Some(3) => decode_as(raw).map(Self::V3),
            Some(version) if version >= u64::from(CURRENT_SCHEMA_VERSION) => {
                decode_as(raw).map(Self::V4)
            }
            Some(_) => None,
        }
    }

    /// Applies exactly one upgrade step; the current version is left as is.
    pub fn step(self) -> Self {
        match self {
            Self::V1(document) => Self::V2(document.upgrade()),
            Self::V2(document) => Self::V3(document.upgrade()),
            Self::V3(document) => Self::V4(document.upgrade()),
            Self::V4(document) => Self::V4(document),
        }
    }

    /// Upgrades until `target` is reached.
    ///
    /// Input already at or above `target` is returned unchanged.
    pub fn upgrade_to(self, target: u32) -> Self {
        let target = target.min(CURRENT_SCHEMA_VERSION);
        let mut document = self;
        while document.version() < target {
            document = document.step();
        }
        document
    }

    /// Upgrades all the way to the current shape.
    pub fn into_current(self) -> GardenDocument {
        let mut document = self;
        loop {
            match document {
                Self::V4(current) => return current,
                older => document = older.step(),
            }
        }
    }
}

/// Returns a valid current-version document with one parcel and no plants.
pub fn fresh() -> GardenDocument {
    GardenDocument::fresh()
}

/// Maps any stored value to a valid current-version document.
///
/// Unknown, corrupt or absent input yields [`fresh`].
pub fn migrate(raw: &Value) -> GardenDocument {
    let Some(document) = VersionedDocument::decode(raw) else {
        if !raw.is_null() {
            warn!("event=doc_migrate module=schema status=fallback reason=unrecognized_document");
        }
        return fresh();
    };

    let from_version = document.version();
    let migrated = document.into_current();
    if from_version != CURRENT_SCHEMA_VERSION {
        debug!(
            "event=doc_migrate module=schema status=ok from_version={} to_version={} parcels={} plants={}",
            from_version,
            CURRENT_SCHEMA_VERSION,
            migrated.parcels().len(),
            migrated.plants().len()
        );
    }
    migrated
}

/// Parses stored text, treating unparseable input like an absent document.
pub fn migrate_text(raw: &str) -> GardenDocument {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => migrate(&value),
        Err(_) => {
            warn!("event=doc_migrate module=schema status=fallback reason=unparseable_json");
            fresh()
        }
    }
}

/// Parses and migrates stored text, or returns `None` when it holds no
/// recognizable garden document.
pub fn try_migrate_text(raw: &str) -> Option<GardenDocument> {
    let value = serde_json::from_str::<Value>(raw).ok()?;
    VersionedDocument::decode(&value).map(VersionedDocument::into_current)
}

fn decode_as<T: DeserializeOwned>(raw: &Value) -> Option<T> {
    serde_json::from_value(raw.clone()).ok()
}

fn version_number(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|v| v.is_finite() && *v >= 0.0).map(|v| v as u64)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn looks_like_legacy(object: &Map<String, Value>) -> bool {
    ["grid", "rows", "cols", "plants"]
        .iter()
        .any(|key| object.contains_key(*key))
}
