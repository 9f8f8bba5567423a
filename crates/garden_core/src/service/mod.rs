//! Use-case layer over the garden document and its key-value store.

pub mod garden_service;
mod parcel_service;
mod plant_service;
mod profile_service;

pub use garden_service::{
    document_key, unreadable_key, GardenError, GardenResult, GardenService, PROFILE_INDEX_KEY,
};
