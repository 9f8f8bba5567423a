use garden_core::{
    flagged_cells, migrate, rotation_history, CellKey, GardenService, MemoryKeyValueStore,
    NewPlant, RotationEntry,
};
use serde_json::json;

fn entry(year: i32, name: &str) -> RotationEntry {
    RotationEntry {
        year,
        plant_name: name.to_string(),
    }
}

fn parcel_with_history(history: serde_json::Value) -> serde_json::Value {
    json!({
        "schemaVersion": 4,
        "plants": {
            "bean": {"id": "bean", "name": "Bean", "plantedAt": "2021-04-01"},
            "corn": {"id": "corn", "name": "Corn", "plantedAt": "2020-05-01"}
        },
        "parcels": {
            "p": {"id": "p", "name": "Plot", "rows": 1, "cols": 2,
                  "grid": [[{"plantId": "bean", "history": history}, {}]]}
        },
        "currentParcelId": "p"
    })
}

#[test]
fn same_year_entries_keep_the_first_seen() {
    let doc = migrate(&parcel_with_history(json!([
        {"ts": "2024-05-01", "plantId": "bean"},
        {"ts": "2023-06-01", "plantId": "bean"},
        {"ts": "2023-04-01", "plantId": "corn"},
        {"ts": "2022-04-01", "plantId": "corn"}
    ])));

    let report = rotation_history(&doc, "p", 3);
    assert_eq!(
        report[&CellKey::new(0, 0)],
        vec![entry(2024, "Bean"), entry(2023, "Bean"), entry(2022, "Corn")]
    );
    assert!(report[&CellKey::new(0, 1)].is_empty());
    assert_eq!(report.len(), 2);
    assert_eq!(flagged_cells(&report), vec![CellKey::new(0, 0)]);

    let short = rotation_history(&doc, "p", 1);
    assert_eq!(short[&CellKey::new(0, 0)], vec![entry(2024, "Bean")]);
    assert!(flagged_cells(&short).is_empty());
}

#[test]
fn cleared_and_dangling_entries_are_skipped() {
    let doc = migrate(&parcel_with_history(json!([
        {"ts": "2024-05-01", "plantId": null},
        {"ts": "2024-04-01", "plantId": "deleted"},
        {"ts": "garbled", "plantId": "corn"},
        {"ts": null, "plantId": "bean"}
    ])));

    // Only the entry with no timestamp falls back to the planting year.
    let report = rotation_history(&doc, "p", 5);
    assert_eq!(report[&CellKey::new(0, 0)], vec![entry(2021, "Bean")]);
}

#[test]
fn garbled_timestamps_skip_the_entry() {
    let doc = migrate(&parcel_with_history(json!([
        {"ts": "garbled", "plantId": "corn"}
    ])));
    assert!(rotation_history(&doc, "p", 5)[&CellKey::new(0, 0)].is_empty());

    // The garbled value is kept, so a reload still skips it.
    let reread = migrate(&serde_json::to_value(&doc).unwrap());
    assert!(rotation_history(&reread, "p", 5)[&CellKey::new(0, 0)].is_empty());
}

#[test]
fn unknown_parcel_gives_empty_report() {
    let doc = migrate(&json!(null));
    assert!(rotation_history(&doc, "nope", 5).is_empty());
}

#[test]
fn report_serializes_with_cell_keys() {
    let doc = migrate(&parcel_with_history(json!([
        {"ts": "2024-05-01", "plantId": "bean"}
    ])));
    let value = serde_json::to_value(rotation_history(&doc, "p", 5)).unwrap();
    assert_eq!(
        value,
        json!({"0,0": [{"year": 2024, "plantName": "Bean"}], "0,1": []})
    );
}

#[test]
fn service_reports_on_live_placements() {
    let mut service = GardenService::new(MemoryKeyValueStore::new()).unwrap();
    let pid = service.add_plant(NewPlant::named("Salade")).unwrap();
    service.place_plant(0, 0, &pid).unwrap();
    service.place_plant(0, 0, &pid).unwrap();

    let parcel_id = service.current_parcel().id.clone();
    let report = service.rotation_history(&parcel_id, 5);
    assert_eq!(report[&CellKey::new(0, 0)].len(), 1);
    assert_eq!(report[&CellKey::new(0, 0)][0].plant_name, "Salade");
    assert_eq!(service.current_rotation_history(), report);
}
