use crate::store::ReferenceStore;
use crate::table::{Table, Value};

const HEADERS: [&str; 9] = [
    "Project Name",
    "Unit Name",
    "Country/Area",
    "Subnational",
    "Latitude",
    "Longitude",
    "Status",
    "Capacity (MW)",
    "EIA plant + unit ID",
];

#[allow(clippy::too_many_arguments)]
fn row(
    name: &str,
    unit: &str,
    country: &str,
    subnational: &str,
    lat: Value,
    lon: Value,
    status: &str,
    capacity: f64,
    id: &str,
) -> Vec<Value> {
    vec![
        Value::text(name),
        Value::text(unit),
        Value::text(country),
        Value::text(subnational),
        lat,
        lon,
        Value::text(status),
        Value::number(capacity),
        Value::text(id),
    ]
}

/// A small GCPT extract with raw headers.
///
/// Rows 0-2 are the US plants with valid EIA ids. Row 4 duplicates row 3 on
/// (project, unit). Row 9 has unparseable coordinates, row 10 a free-text id,
/// row 11 an out-of-range latitude.
pub fn gcpt_table() -> Table {
    let n = Value::Number;
    Table::from_rows(
        HEADERS.iter().map(|h| h.to_string()).collect(),
        vec![
            row("Colstrip Unit 1", "Unit 1", "United States", "Montana", n(45.88), n(-106.61), "operating", 307.0, "6076|1"),
            row("Navajo Generating Station Unit 1", "Unit 1", "United States", "Arizona", n(36.90), n(-111.39), "retired", 750.0, "4941|1"),
            row("Scherer Unit 1", "Unit 1", "United States", "Georgia", n(33.06), n(-83.81), "operating", 891.0, "6257|1"),
            row("Belchatow", "Unit 1", "Poland", "Lodz", n(51.26), n(19.33), "operating", 370.0, ""),
            row("Belchatow", "Unit 1", "Poland", "Lodz", n(51.27), n(19.34), "operating", 370.0, ""),
            row("Belchatow", "Unit 2", "Poland", "Lodz", n(51.26), n(19.33), "operating", 370.0, ""),
            row("Drax", "Unit 1", "United Kingdom", "England", n(53.74), n(-0.99), "retired", 660.0, ""),
            row("Mundra", "Unit 1", "India", "Gujarat", n(22.82), n(69.55), "operating", 660.0, ""),
            row("Mundra", "Unit 2", "India", "Gujarat", Value::text("22.82"), Value::text("69.55"), "operating", 660.0, ""),
            row("Tiroda", "Unit 1", "India", "Maharashtra", Value::text("n/a"), n(79.97), "operating", 660.0, ""),
            row("Brandon Shores", "Unit 1", "United States", "Maryland", n(39.18), n(-76.54), "operating", 685.0, "52071, EIA: 602|1"),
            row("Polar Test", "Unit 1", "United States", "Alaska", n(95.0), n(-150.0), "cancelled", 50.0, "1234|1"),
        ],
    )
}

pub fn gcpt_store() -> ReferenceStore {
    ReferenceStore::from_table(gcpt_table())
}
