//! SQLite bootstrap for the key-value store backing garden documents.
//!
//! # Responsibility
//! - Open and configure SQLite connections.
//! - Bring the `kv_entries` table up to the version this build expects.
//!
//! # Invariants
//! - Table version is tracked via `PRAGMA user_version`.
//! - A connection is only handed out once `kv_entries` exists.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

/// Table holding one JSON snapshot per storage key.
pub const STORE_TABLE: &str = "kv_entries";

pub type DbResult<T> = Result<T, DbError>;

/// Failures while opening or upgrading a store file.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The store file was written by a build with newer tables.
    StoreFromNewerBuild { table_version: u32, supported: u32 },
    /// The file is at a known table version but has no snapshot table.
    MissingStoreTable { table_version: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::StoreFromNewerBuild {
                table_version,
                supported,
            } => write!(
                f,
                "garden store tables are at version {table_version}, this build supports up to {supported}"
            ),
            Self::MissingStoreTable { table_version } => write!(
                f,
                "not a garden store: table `{STORE_TABLE}` is missing at version {table_version}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::StoreFromNewerBuild { .. } | Self::MissingStoreTable { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
