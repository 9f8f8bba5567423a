//! Garden domain model.
//!
//! # Responsibility
//! - Define the per-profile document (plants, parcels, grids) and the
//!   profile index.
//! - Keep every aggregate mutation pure: no I/O happens in this layer.
//!
//! # Invariants
//! - Cells refer to plants by id only; a dangling id reads as an empty cell.
//! - Log lists and cell histories are newest-first.

pub mod garden;
pub(crate) mod lenient;
pub mod plant;
pub mod profile;

pub use lenient::{parse_date_text, quantity_from_text};
