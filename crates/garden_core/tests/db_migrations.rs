use garden_core::db::migrations::latest_version;
use garden_core::db::{open_db, open_db_in_memory, DbError};
use garden_core::{
    document_key, GardenConfig, GardenService, KeyValueStore, NewPlant, SqliteKeyValueStore,
    PROFILE_INDEX_KEY,
};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_creates_kv_table() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "kv_entries");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garden.sqlite3");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "kv_entries");
}

#[test]
fn opening_database_with_newer_table_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::StoreFromNewerBuild {
            table_version,
            supported,
        } => {
            assert_eq!(table_version, 999);
            assert_eq!(supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn foreign_database_at_current_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("foreign.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(&format!(
        "CREATE TABLE notes (body TEXT); PRAGMA user_version = {};",
        latest_version()
    ))
    .unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    assert!(matches!(err, DbError::MissingStoreTable { .. }), "{err}");
}

#[test]
fn documents_survive_reopening_the_store_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = GardenConfig {
        db_path: Some(dir.path().join("garden.sqlite3")),
        ..GardenConfig::default()
    };

    let (profile_id, plant_id) = {
        let mut service = GardenService::open(&config).unwrap();
        let plant_id = service.add_plant(NewPlant::named("Tomate")).unwrap();
        service.place_plant(1, 2, &plant_id).unwrap();
        (service.current_profile_id().to_string(), plant_id)
    };

    let service = GardenService::open(&config).unwrap();
    assert_eq!(service.current_profile_id(), profile_id);
    assert_eq!(service.document().plant(&plant_id).unwrap().name, "Tomate");
    let cell = service.current_parcel().cell(1, 2).unwrap();
    assert_eq!(cell.plant_id.as_deref(), Some(plant_id.as_str()));
    assert_eq!(cell.history.len(), 1);

    let store = service.into_store();
    assert!(store.retrieve(PROFILE_INDEX_KEY).unwrap().is_some());
    assert!(store.retrieve(&document_key(&profile_id)).unwrap().is_some());
}

#[test]
fn corrupt_rows_are_recovered_as_fresh_state() {
    let mut store = SqliteKeyValueStore::open_in_memory().unwrap();
    store.persist(PROFILE_INDEX_KEY, "{ not json").unwrap();

    let service = GardenService::new(store).unwrap();
    assert_eq!(service.list_profiles().len(), 1);
    assert_eq!(service.document().parcels().len(), 1);
    assert!(service.document().plants().is_empty());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
