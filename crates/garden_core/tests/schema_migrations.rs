use chrono::NaiveDate;
use garden_core::schema::{FALLBACK_LOCATION, LEGACY_PARCEL_ID};
use garden_core::{
    migrate, migrate_text, try_migrate_text, EventTime, GardenDocument, VersionedDocument,
    CURRENT_SCHEMA_VERSION,
};
use proptest::prelude::*;
use serde_json::{json, Value};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn assert_fresh(doc: &GardenDocument) {
    assert_eq!(doc.schema_version(), CURRENT_SCHEMA_VERSION);
    assert_eq!(doc.parcels().len(), 1);
    assert!(doc.plants().is_empty());
    assert!(doc.parcel(doc.current_parcel_id()).is_some());
}

fn assert_rectangular(doc: &GardenDocument) {
    for parcel in doc.parcels().values() {
        assert!(parcel.rows >= 1 && parcel.cols >= 1);
        assert_eq!(parcel.grid.len(), parcel.rows);
        assert!(parcel.grid.iter().all(|row| row.len() == parcel.cols));
    }
}

fn assert_idempotent(raw: &Value) {
    let first = migrate(raw);
    let second = migrate(&serde_json::to_value(&first).unwrap());
    assert_eq!(first, second);
}

#[test]
fn absent_and_garbage_input_yield_fresh_document() {
    for raw in [
        json!(null),
        json!("not a document"),
        json!(42),
        json!([{"grid": []}]),
        json!({"theme": "dark"}),
        json!({"version": 0, "plants": {}}),
        json!({"schemaVersion": 4, "plants": "nope"}),
    ] {
        assert_fresh(&migrate(&raw));
    }
    assert_fresh(&migrate_text("{ definitely not json"));
    assert_fresh(&migrate_text(""));
}

#[test]
fn legacy_single_grid_becomes_one_located_parcel() {
    let raw = json!({
        "rows": 2,
        "cols": 3,
        "plants": {
            "p1": {"id": "p1", "name": "Tomate", "plantedAt": "2023-04-02", "waterings": [
                {"id": "w1", "date": "2023-05-01", "amountL": "1,5"}
            ]}
        },
        "grid": [
            [{"plantId": "p1"}, {"plantId": null}, {}],
            [{}, {}]
        ],
        "weather": {"lat": 45.75, "lon": 4.85}
    });

    let doc = migrate(&raw);
    assert_eq!(doc.schema_version(), CURRENT_SCHEMA_VERSION);
    assert_eq!(doc.current_parcel_id(), LEGACY_PARCEL_ID);
    assert_rectangular(&doc);

    let parcel = doc.current_parcel();
    assert_eq!((parcel.rows, parcel.cols), (2, 3));
    assert_eq!((parcel.lat, parcel.lon), (Some(45.75), Some(4.85)));

    let cell = parcel.cell(0, 0).unwrap();
    assert_eq!(cell.plant_id.as_deref(), Some("p1"));
    assert_eq!(cell.history.len(), 1);
    assert_eq!(cell.history[0].timestamp.date(), Some(date(2023, 4, 2)));
    assert_eq!(cell.history[0].plant_id.as_deref(), Some("p1"));
    assert!(parcel.cell(0, 1).unwrap().history.is_empty());

    let plant = doc.plant("p1").unwrap();
    assert_eq!(plant.waterings[0].amount_l, 1.5);
    assert_idempotent(&raw);
}

#[test]
fn version_two_gets_history_and_fallback_location() {
    let raw = json!({
        "version": 2,
        "plants": {"p1": {"id": "p1", "name": "Haricot", "plantedAt": "2022-05-10"}},
        "parcels": {
            "a": {
                "id": "a", "name": "Nord", "rows": 1, "cols": 2,
                "grid": [[{"plantId": "p1", "layers": {"mulch": true}}, {"plantId": "gone"}]]
            },
            "b": {"id": "b", "name": "Sud", "rows": 1, "cols": 1, "grid": [[{}]]}
        },
        "currentParcelId": "b"
    });

    let doc = migrate(&raw);
    assert_eq!(doc.current_parcel_id(), "b");
    let north = doc.parcel("a").unwrap();
    assert_eq!((north.lat, north.lon), (Some(FALLBACK_LOCATION.0), Some(FALLBACK_LOCATION.1)));

    let seeded = north.cell(0, 0).unwrap();
    assert!(seeded.layer("mulch"));
    assert_eq!(seeded.history[0].timestamp.date(), Some(date(2022, 5, 10)));

    // Dangling references keep a history entry without a date.
    let dangling = north.cell(0, 1).unwrap();
    assert_eq!(dangling.history.len(), 1);
    assert_eq!(dangling.history[0].timestamp, EventTime::Absent);
    assert!(doc.resolve_plant(dangling.plant_id.as_deref()).is_none());
    assert_idempotent(&raw);
}

#[test]
fn version_three_keeps_history_and_reads_loose_timestamps() {
    let raw = json!({
        "version": 3,
        "plants": {"p1": {"id": "p1", "name": "Courge"}},
        "parcels": {
            "a": {
                "id": "a", "name": "Potager", "rows": 1, "cols": 1,
                "grid": [[{
                    "plantId": "p1",
                    "history": [
                        {"ts": "2024-06-01T08:00:00.000Z", "plantId": "p1"},
                        {"ts": 1_685_620_800_000_i64, "plantId": null},
                        {"ts": "whenever", "plantId": "p1"}
                    ]
                }]]
            }
        },
        "currentParcelId": "a",
        "weather": {"lat": "50.5", "lon": 3.1}
    });

    let doc = migrate(&raw);
    let parcel = doc.current_parcel();
    assert_eq!((parcel.lat, parcel.lon), (Some(50.5), Some(3.1)));

    let history = &parcel.cell(0, 0).unwrap().history;
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].timestamp.date(), Some(date(2024, 6, 1)));
    assert_eq!(history[1].timestamp.date(), Some(date(2023, 6, 1)));
    assert_eq!(history[1].plant_id, None);
    assert_eq!(history[2].timestamp, EventTime::Garbled(json!("whenever")));
    assert_idempotent(&raw);
}

#[test]
fn current_documents_with_broken_invariants_are_repaired() {
    let raw = json!({
        "schemaVersion": 4,
        "plants": {},
        "parcels": {
            "z": {"name": "Z", "rows": 2, "cols": 2, "lat": null, "lon": null,
                  "grid": [[{}, {}, {}], "broken"]},
            "m": {"name": "M", "rows": 0, "cols": 0, "grid": [[{}], [{}, {}]]}
        },
        "currentParcelId": "missing"
    });

    let doc = migrate(&raw);
    assert_rectangular(&doc);
    assert_eq!(doc.current_parcel_id(), "m");
    let inferred = doc.parcel("m").unwrap();
    assert_eq!((inferred.rows, inferred.cols), (2, 2));
    assert_eq!(doc.parcel("z").unwrap().id, "z");
    assert_idempotent(&raw);
}

#[test]
fn malformed_nested_entries_cost_only_themselves() {
    let raw = json!({
        "schemaVersion": 4,
        "plants": {
            "keep": {"id": "keep", "name": "Tomate", "harvests": [{"id": "h1", "weightKg": 2}]},
            "null-logs": {"id": "null-logs", "name": "Menthe", "waterings": null},
            "null-entry": {"id": "null-entry", "name": "Ail", "harvests": [null, {"id": "h2"}]},
            "two-dates": {"id": "two-dates", "name": "Rose", "photos": [
                {"id": "ph", "url": "a.jpg", "date": "2024-05-02", "ts": 1_700_000_000_000_i64}
            ]},
            "junk": "not a plant"
        },
        "parcels": {
            "p": {"id": "p", "name": "Nord", "rows": 1, "cols": 2, "grid": [[
                {"plantId": "keep", "layers": {"mulch": true},
                 "history": [{"ts": "2024-01-01", "plantId": "keep"}, null, 7]},
                null
            ]]},
            "broken": 42
        },
        "currentParcelId": "p",
        "weather": "sunny"
    });

    let doc = migrate(&raw);
    let names: Vec<_> = doc.plants().values().map(|plant| plant.name.as_str()).collect();
    assert_eq!(names, vec!["Tomate", "Menthe", "Ail", "Rose"]);
    assert_eq!(doc.plant("keep").unwrap().harvested_weight_kg(), 2.0);
    assert!(doc.plant("null-logs").unwrap().waterings.is_empty());
    assert_eq!(doc.plant("null-entry").unwrap().harvests.len(), 1);
    assert_eq!(doc.plant("two-dates").unwrap().photos[0].date, Some(date(2024, 5, 2)));

    assert_eq!(doc.parcels().len(), 1);
    let cell = doc.current_parcel().cell(0, 0).unwrap();
    assert_eq!(cell.plant_id.as_deref(), Some("keep"));
    assert!(cell.layer("mulch"));
    assert_eq!(cell.history.len(), 1);
    assert_eq!(cell.history[0].timestamp.date(), Some(date(2024, 1, 1)));
    assert_idempotent(&raw);
}

#[test]
fn stored_order_of_parcels_and_plants_is_kept() {
    let raw = json!({
        "schemaVersion": 4,
        "plants": {"zz": {"name": "Z"}, "aa": {"name": "A"}},
        "parcels": {
            "zeta": {"name": "Zeta", "rows": 1, "cols": 1},
            "alpha": {"name": "Alpha", "rows": 1, "cols": 1},
            "mid": {"name": "Mid", "rows": 1, "cols": 1}
        },
        "currentParcelId": "missing"
    });
    let doc = migrate(&raw);
    let parcels: Vec<_> = doc.parcels().keys().map(String::as_str).collect();
    assert_eq!(parcels, vec!["zeta", "alpha", "mid"]);
    assert_eq!(doc.current_parcel_id(), "zeta");
    let plants: Vec<_> = doc.plants().keys().map(String::as_str).collect();
    assert_eq!(plants, vec!["zz", "aa"]);

    let reread = migrate(&serde_json::to_value(&doc).unwrap());
    let reread_parcels: Vec<_> = reread.parcels().keys().map(String::as_str).collect();
    assert_eq!(reread_parcels, parcels);
}

#[test]
fn unrecognizable_text_is_reported_by_try_migrate_text() {
    assert!(try_migrate_text("{ nope").is_none());
    assert!(try_migrate_text(r#"{"theme": "dark"}"#).is_none());
    let doc = try_migrate_text(r#"{"version": 2, "parcels": {}}"#).unwrap();
    assert_eq!(doc.parcels().len(), 1);
}

#[test]
fn stepwise_upgrade_reaches_every_version() {
    let raw = json!({"rows": 1, "cols": 1, "grid": [[{}]]});
    let legacy = VersionedDocument::decode(&raw).unwrap();
    assert_eq!(legacy.version(), 1);

    let v3 = legacy.clone().upgrade_to(3);
    assert_eq!(v3.version(), 3);
    let current = v3.step();
    assert_eq!(current.version(), CURRENT_SCHEMA_VERSION);
    assert_eq!(current.step().version(), CURRENT_SCHEMA_VERSION);

    assert_eq!(legacy.into_current().current_parcel_id(), "legacy-grid");
}

#[test]
fn fresh_documents_round_trip_unchanged() {
    assert_idempotent(&serde_json::to_value(GardenDocument::fresh()).unwrap());
    assert_idempotent(&json!(null));
}

fn json_value() -> impl Strategy<Value = Value> {
    let key = prop_oneof![
        Just("version"),
        Just("schemaVersion"),
        Just("plants"),
        Just("parcels"),
        Just("currentParcelId"),
        Just("grid"),
        Just("rows"),
        Just("cols"),
        Just("plantId"),
        Just("history"),
        Just("ts"),
        Just("layers"),
        Just("weather"),
        Just("name"),
        Just("p1"),
        Just("waterings"),
        Just("harvests"),
        Just("photos"),
        Just("date"),
        Just("weightKg"),
    ]
    .prop_map(String::from);
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        (0_i64..12).prop_map(Value::from),
        (-1.0e3_f64..1.0e3).prop_map(Value::from),
        "[a-z0-9 -]{0,10}".prop_map(Value::from),
    ];
    leaf.prop_recursive(4, 48, 5, move |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map(key.clone(), inner, 0..5)
                .prop_map(|entries| Value::Object(entries.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn migrate_is_total_valid_and_idempotent(raw in json_value()) {
        let first = migrate(&raw);
        prop_assert_eq!(first.schema_version(), CURRENT_SCHEMA_VERSION);
        prop_assert!(!first.parcels().is_empty());
        prop_assert!(first.parcel(first.current_parcel_id()).is_some());
        for parcel in first.parcels().values() {
            prop_assert_eq!(parcel.grid.len(), parcel.rows);
            prop_assert!(parcel.grid.iter().all(|row| row.len() == parcel.cols));
        }

        let second = migrate(&serde_json::to_value(&first).unwrap());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn valid_data_survives_malformed_siblings(noise in json_value()) {
        let raw = json!({
            "schemaVersion": 4,
            "plants": {
                "keep": {"name": "Tomate", "harvests": [{"id": "h1", "weightKg": 1.5}]},
                "noise": {"name": "Bruit", "waterings": noise.clone(), "photos": [noise.clone()]}
            },
            "parcels": {
                "p": {"name": "Nord", "rows": 1, "cols": 2, "grid": [[
                    {"plantId": "keep", "history": [{"ts": "2024-01-01", "plantId": "keep"}, noise.clone()]},
                    noise.clone()
                ]]},
                "other": noise.clone()
            },
            "currentParcelId": "p"
        });

        let doc = migrate(&raw);
        let keep = doc.plant("keep");
        prop_assert!(keep.is_some());
        prop_assert_eq!(keep.map(|plant| plant.harvested_weight_kg()), Some(1.5));
        let cell = doc.parcel("p").and_then(|parcel| parcel.cell(0, 0)).cloned().unwrap_or_default();
        prop_assert_eq!(cell.plant_id.as_deref(), Some("keep"));
        prop_assert_eq!(cell.history.first().and_then(|event| event.timestamp.date()), Some(date(2024, 1, 1)));

        let second = migrate(&serde_json::to_value(&doc).unwrap());
        prop_assert_eq!(doc, second);
    }
}
