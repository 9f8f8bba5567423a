//! Table migrations for the snapshot store.
//!
//! Each step reshapes `kv_entries`; document contents are never touched here
//! (see `crate::schema` for document upgrades).
//!
//! # Invariants
//! - Steps are listed in strictly increasing `version` order.
//! - Pending steps run in one transaction, and each bumps
//!   `PRAGMA user_version`.

use crate::db::{DbError, DbResult, STORE_TABLE};
use log::{debug, info};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct TableStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const TABLE_STEPS: &[TableStep] = &[
    TableStep {
        version: 1,
        name: "kv_entries",
        sql: include_str!("0001_kv_entries.sql"),
    },
    TableStep {
        version: 2,
        name: "kv_entries_updated_at_index",
        sql: include_str!("0002_kv_entries_updated_at_index.sql"),
    },
];

/// Latest table version this build can write.
pub fn latest_version() -> u32 {
    TABLE_STEPS.last().map_or(0, |step| step.version)
}

/// Table version recorded in the store file.
pub fn table_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

/// Upgrades the snapshot table to [`latest_version`] and checks it exists.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let on_disk = table_version(conn)?;
    let latest = latest_version();
    if on_disk > latest {
        return Err(DbError::StoreFromNewerBuild {
            table_version: on_disk,
            supported: latest,
        });
    }

    if on_disk < latest {
        let tx = conn.transaction()?;
        for step in TABLE_STEPS.iter().filter(|step| step.version > on_disk) {
            tx.execute_batch(step.sql)?;
            tx.execute_batch(&format!("PRAGMA user_version = {};", step.version))?;
            debug!(
                "event=db_migrate_step module=db status=ok version={} step={}",
                step.version, step.name
            );
        }
        tx.commit()?;
        info!(
            "event=db_migrate module=db status=ok from_version={} to_version={}",
            on_disk, latest
        );
    }

    if !store_table_exists(conn)? {
        return Err(DbError::MissingStoreTable {
            table_version: on_disk.max(latest),
        });
    }
    Ok(())
}

fn store_table_exists(conn: &Connection) -> DbResult<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
        [STORE_TABLE],
        |row| row.get::<_, bool>(0),
    )?;
    Ok(exists)
}
