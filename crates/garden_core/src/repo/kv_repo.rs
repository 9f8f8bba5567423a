//! Key-value store contract and its SQLite implementation.
//!
//! # Responsibility
//! - Persist whole JSON snapshots under string keys.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - `persist` replaces the previous value for the key in a single statement.
//! - `retrieve` hands back stored text untouched; decoding and recovery from
//!   corrupt text belong to the caller.

use crate::db::{open_db, open_db_in_memory, DbError};
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

pub type RepoResult<T> = Result<T, RepoError>;

/// Storage transport error.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable, synchronous key-value storage for serialized documents.
pub trait KeyValueStore {
    /// Stores `value` under `key`, replacing any previous value.
    fn persist(&mut self, key: &str, value: &str) -> RepoResult<()>;
    /// Returns the stored text, or `None` when the key is absent.
    fn retrieve(&self, key: &str) -> RepoResult<Option<String>>;
    /// Deletes `key`; deleting an absent key is not an error.
    fn remove(&mut self, key: &str) -> RepoResult<()>;
}

/// SQLite-backed key-value store.
pub struct SqliteKeyValueStore {
    conn: Connection,
}

impl SqliteKeyValueStore {
    /// Wraps a connection that already went through `open_db*`.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Opens (creating if needed) a store file.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn open_in_memory() -> RepoResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn persist(&mut self, key: &str, value: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO kv_entries (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )?;
        Ok(())
    }

    fn retrieve(&self, key: &str) -> RepoResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn remove(&mut self, key: &str) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM kv_entries WHERE key = ?1;", [key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{KeyValueStore, SqliteKeyValueStore};

    #[test]
    fn persist_overwrites_and_remove_is_idempotent() {
        let mut store = SqliteKeyValueStore::open_in_memory().unwrap();
        assert_eq!(store.retrieve("k").unwrap(), None);

        store.persist("k", "first").unwrap();
        store.persist("k", "second").unwrap();
        assert_eq!(store.retrieve("k").unwrap().as_deref(), Some("second"));

        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.retrieve("k").unwrap(), None);
    }
}
