//! Harvest weight aggregations.

use crate::model::garden::GardenDocument;
use crate::report::occupied_cells;
use serde::Serialize;
use std::collections::BTreeMap;

/// One aggregated bucket: a label and its total weight in kilograms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarvestTotal {
    pub key: String,
    pub value: f64,
}

/// Total harvested weight per "name – variety" label.
///
/// Plants sharing a label are merged; plants without harvests show `0.0`.
pub fn harvest_by_variety(doc: &GardenDocument) -> Vec<HarvestTotal> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for plant in doc.plants().values() {
        *totals.entry(plant.label()).or_default() += plant.harvested_weight_kg();
    }
    ranked(totals)
}

/// Harvested weight per parcel name, counting each occupied cell once.
///
/// A plant placed in three cells contributes its harvest weight three times;
/// stale cell references contribute nothing.
pub fn harvest_by_parcel(doc: &GardenDocument) -> Vec<HarvestTotal> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for parcel in doc.parcels().values() {
        let weight: f64 = occupied_cells(parcel)
            .filter_map(|(_, _, plant_id)| doc.plant(plant_id))
            .map(|plant| plant.harvested_weight_kg())
            .sum();
        *totals.entry(parcel.name.clone()).or_default() += weight;
    }
    ranked(totals)
}

fn ranked(totals: BTreeMap<String, f64>) -> Vec<HarvestTotal> {
    let mut out: Vec<HarvestTotal> = totals
        .into_iter()
        .map(|(key, value)| HarvestTotal { key, value })
        .collect();
    out.sort_by(|a, b| b.value.total_cmp(&a.value).then_with(|| a.key.cmp(&b.key)));
    out
}
