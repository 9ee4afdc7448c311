//! Crosswalk Builder: source-specific projections of the reference table.
//!
//! Two policies share one output shape:
//!
//! - **Exact id** (`eia`): rows carrying a strict `"<code>|<generator>"` id,
//!   split into `plant_code` / `generator_id`. No dedup here; uniqueness is a
//!   primary key at persistence time.
//! - **Regional** (`entsoe`, `npp`): rows in a configured country set,
//!   deduplicated on (project_name, unit_name), first occurrence wins.
//!
//! Both drop rows without valid coordinates and return an empty crosswalk
//! rather than an error when there is nothing to build from.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use log::{error, info, warn};

use crate::config::{RegionConfig, RegionsConfig};
use crate::error::ReconError;
use crate::keys::{is_strict_composite_id, split_composite_id};
use crate::schema::{Field, Schema};
use crate::store::ReferenceStore;
use crate::table::{Table, Value};

pub const PLANT_CODE: &str = "plant_code";
pub const GENERATOR_ID: &str = "generator_id";

/// Output columns of the exact-id crosswalk, before dropping absent ones.
pub const EIA_COLUMNS: [&str; 9] = [
    "eia_plant_unit_id",
    PLANT_CODE,
    GENERATOR_ID,
    "project_name",
    "unit_name",
    "latitude",
    "longitude",
    "subnational",
    "status",
];

/// Output columns of the regional crosswalks, before dropping absent ones.
pub const REGIONAL_COLUMNS: [&str; 8] = [
    "project_name",
    "unit_name",
    "country",
    "subnational",
    "latitude",
    "longitude",
    "status",
    "capacity_mw",
];

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrosswalkSource {
    Eia,
    Entsoe,
    Npp,
}

/// How a crosswalk's rows are kept unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrosswalkKey {
    /// The composite external id.
    CompositeId,
    /// (project_name, unit_name).
    NameUnit,
}

impl CrosswalkSource {
    pub const ALL: [CrosswalkSource; 3] = [Self::Eia, Self::Entsoe, Self::Npp];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Eia => "eia",
            Self::Entsoe => "entsoe",
            Self::Npp => "npp",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Eia => "EIA",
            Self::Entsoe => "ENTSOE",
            Self::Npp => "India NPP",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}_plant_coordinates.csv", self.name())
    }

    pub fn table_name(&self) -> String {
        format!("plant_coordinates_{}", self.name())
    }

    pub fn key(&self) -> CrosswalkKey {
        match self {
            Self::Eia => CrosswalkKey::CompositeId,
            Self::Entsoe | Self::Npp => CrosswalkKey::NameUnit,
        }
    }

    pub fn key_columns(&self) -> &'static [&'static str] {
        match self.key() {
            CrosswalkKey::CompositeId => &["eia_plant_unit_id"],
            CrosswalkKey::NameUnit => &["project_name", "unit_name"],
        }
    }
}

impl fmt::Display for CrosswalkSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CrosswalkSource {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|source| source.name() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| {
                ReconError::ConfigValidation(format!(
                    "unknown crosswalk source '{s}' (expected eia, entsoe or npp)"
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Crosswalk
// ---------------------------------------------------------------------------

/// A built crosswalk. Immutable once built; rebuild to refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct Crosswalk {
    pub source: CrosswalkSource,
    pub table: Table,
}

impl Crosswalk {
    pub fn empty(source: CrosswalkSource) -> Self {
        Self {
            source,
            table: Table::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Result of building several sources at once.
#[derive(Debug, Default)]
pub struct BuildOutcome {
    pub built: Vec<Crosswalk>,
    /// Sources that produced no rows and must not be persisted.
    pub skipped: Vec<CrosswalkSource>,
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn build(source: CrosswalkSource, store: &ReferenceStore, regions: &RegionsConfig) -> Crosswalk {
    match source {
        CrosswalkSource::Eia => build_eia_crosswalk(store),
        CrosswalkSource::Entsoe => build_regional_crosswalk(store, source, &regions.entsoe),
        CrosswalkSource::Npp => build_regional_crosswalk(store, source, &regions.npp),
    }
}

pub fn build_all(
    store: &ReferenceStore,
    sources: &[CrosswalkSource],
    regions: &RegionsConfig,
) -> BuildOutcome {
    let mut outcome = BuildOutcome::default();
    for &source in sources {
        let crosswalk = build(source, store, regions);
        if crosswalk.is_empty() {
            warn!("No data for {source} crosswalk");
            outcome.skipped.push(source);
        } else {
            outcome.built.push(crosswalk);
        }
    }
    outcome
}

pub fn build_eia_crosswalk(store: &ReferenceStore) -> Crosswalk {
    let source = CrosswalkSource::Eia;
    info!("Building {} crosswalk...", source.label());

    let reference = store.load();
    if reference.is_empty() {
        error!("No GCPT data loaded");
        return Crosswalk::empty(source);
    }
    if let Err(missing) = reference
        .schema()
        .require(&[Field::ExternalId, Field::Latitude, Field::Longitude])
    {
        error!("{missing} column not found");
        return Crosswalk::empty(source);
    }

    let schema = reference.schema();
    let columns: Vec<&str> = EIA_COLUMNS
        .into_iter()
        .filter(|c| *c == PLANT_CODE || *c == GENERATOR_ID || column_present(schema, c))
        .collect();

    let mut rows = Vec::new();
    let mut invalid_ids = 0usize;
    let mut invalid_coords = 0usize;

    for record in reference.records() {
        let Some(id) = record.eia_plant_unit_id.as_deref() else {
            continue;
        };
        let parts = match split_composite_id(id) {
            Some(parts) if is_strict_composite_id(id) => parts,
            _ => {
                invalid_ids += 1;
                continue;
            }
        };
        if !record.has_valid_coordinates() {
            invalid_coords += 1;
            continue;
        }

        let row = columns
            .iter()
            .map(|c| match *c {
                PLANT_CODE => Value::text(parts.plant_code.as_str()),
                GENERATOR_ID => Value::text(parts.generator_id.as_str()),
                other => Field::from_canonical(other)
                    .map(|f| record.value(f))
                    .unwrap_or(Value::Null),
            })
            .collect();
        rows.push(row);
    }

    if invalid_ids > 0 {
        warn!("Dropped {invalid_ids} rows with malformed EIA ids");
    }
    if invalid_coords > 0 {
        info!("Dropped {invalid_coords} EIA rows without valid coordinates");
    }

    let table = Table::from_rows(columns.iter().map(|c| c.to_string()).collect(), rows);
    info!("Built {} crosswalk with {} records", source.label(), table.len());
    Crosswalk { source, table }
}

pub fn build_regional_crosswalk(
    store: &ReferenceStore,
    source: CrosswalkSource,
    region: &RegionConfig,
) -> Crosswalk {
    info!("Building {} crosswalk...", source.label());

    let plants = store.region_plants(region);
    if plants.is_empty() {
        warn!(
            "No plants found in GCPT data for {} ({})",
            source.label(),
            region.countries.join(", ")
        );
        return Crosswalk::empty(source);
    }

    let columns: Vec<&str> = REGIONAL_COLUMNS
        .into_iter()
        .filter(|c| column_present(plants.schema(), c))
        .collect();

    let mut invalid_coords = 0usize;
    let mut rows = Vec::new();
    for record in plants.records() {
        if !record.has_valid_coordinates() {
            invalid_coords += 1;
            continue;
        }
        rows.push(
            columns
                .iter()
                .filter_map(|c| Field::from_canonical(c))
                .map(|f| record.value(f))
                .collect(),
        );
    }
    if invalid_coords > 0 {
        info!("Dropped {invalid_coords} {} rows without valid coordinates", source.label());
    }

    let table = Table::from_rows(columns.iter().map(|c| c.to_string()).collect(), rows);
    let table = dedup_name_unit(&table);
    info!("Built {} crosswalk with {} records", source.label(), table.len());
    Crosswalk { source, table }
}

fn column_present(schema: &Schema, column: &str) -> bool {
    Field::from_canonical(column).is_some_and(|f| schema.has(f))
}

/// Keep the first row of each (project_name, unit_name) pair.
///
/// An absent column or a null cell is part of the key like any other value,
/// so two rows with a null unit name and the same project collapse.
pub fn dedup_name_unit(table: &Table) -> Table {
    dedup_by_columns(table, &["project_name", "unit_name"])
}

/// Keep the first row of each distinct key over `key_columns`.
pub fn dedup_by_columns(table: &Table, key_columns: &[&str]) -> Table {
    let indices: Vec<Option<usize>> = key_columns.iter().map(|c| table.column_index(c)).collect();
    let mut seen: HashSet<Vec<Option<String>>> = HashSet::new();
    let keep: Vec<usize> = table
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            let key = indices
                .iter()
                .map(|i| i.and_then(|i| row[i].to_text()))
                .collect();
            seen.insert(key)
        })
        .map(|(i, _)| i)
        .collect();
    table.select_rows(&keep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySource;
    use crate::test_fixtures::{gcpt_store, gcpt_table};
    use proptest::prelude::*;

    #[test]
    fn source_names_and_paths() {
        assert_eq!(CrosswalkSource::Entsoe.file_name(), "entsoe_plant_coordinates.csv");
        assert_eq!(CrosswalkSource::Npp.table_name(), "plant_coordinates_npp");
        assert_eq!(CrosswalkSource::Eia.key_columns(), &["eia_plant_unit_id"]);
        assert_eq!("ENTSOE".parse::<CrosswalkSource>().unwrap(), CrosswalkSource::Entsoe);
        assert!("ferc".parse::<CrosswalkSource>().is_err());
    }

    #[test]
    fn eia_keeps_strict_ids_with_valid_coordinates() {
        let store = gcpt_store();
        let cw = build_eia_crosswalk(&store);
        assert_eq!(cw.source, CrosswalkSource::Eia);
        assert_eq!(cw.table.columns(), &EIA_COLUMNS);
        assert_eq!(cw.len(), 3);

        let ids: Vec<String> = cw
            .table
            .column("eia_plant_unit_id")
            .unwrap()
            .into_iter()
            .filter_map(|v| v.to_text())
            .collect();
        assert_eq!(ids, vec!["6076|1", "4941|1", "6257|1"]);
        assert_eq!(cw.table.get(0, PLANT_CODE), Some(&Value::text("6076")));
        assert_eq!(cw.table.get(0, GENERATOR_ID), Some(&Value::text("1")));
        assert_eq!(cw.table.get(0, "latitude"), Some(&Value::Number(45.88)));
    }

    #[test]
    fn eia_drops_ids_with_extra_parts() {
        let table = Table::from_rows(
            vec![
                "Project Name".into(),
                "Country/Area".into(),
                "Latitude".into(),
                "Longitude".into(),
                "EIA plant + unit ID".into(),
            ],
            vec![
                vec!["Colstrip".into(), "United States".into(), Value::Number(45.88), Value::Number(-106.61), "6076|1|2".into()],
                vec!["Colstrip".into(), "United States".into(), Value::Number(45.88), Value::Number(-106.61), "6076|1".into()],
                vec!["Colstrip".into(), "United States".into(), Value::Number(45.88), Value::Number(-106.61), "6076||".into()],
            ],
        );
        let cw = build_eia_crosswalk(&ReferenceStore::from_table(table));
        assert_eq!(cw.len(), 1);
        assert_eq!(cw.table.get(0, "eia_plant_unit_id"), Some(&Value::text("6076|1")));
        assert_eq!(cw.table.get(0, PLANT_CODE), Some(&Value::text("6076")));
        assert_eq!(cw.table.get(0, GENERATOR_ID), Some(&Value::text("1")));
    }

    #[test]
    fn eia_without_id_column_is_empty() {
        let mut table = gcpt_table();
        table.rename_columns(|c| {
            if c == "EIA plant + unit ID" {
                "Other ID".to_string()
            } else {
                c.to_string()
            }
        });
        let store = ReferenceStore::from_table(table);
        assert!(build_eia_crosswalk(&store).is_empty());
    }

    #[test]
    fn entsoe_dedups_and_keeps_first() {
        let store = gcpt_store();
        let cw = build(CrosswalkSource::Entsoe, &store, &RegionsConfig::default());
        assert_eq!(cw.table.columns(), &REGIONAL_COLUMNS);
        // Belchatow/Unit 1 twice, Belchatow/Unit 2, Drax/Unit 1.
        assert_eq!(cw.len(), 3);
        assert_eq!(cw.table.get(0, "latitude"), Some(&Value::Number(51.26)));
        assert_eq!(cw.table.get(2, "project_name"), Some(&Value::text("Drax")));
    }

    #[test]
    fn npp_drops_invalid_coordinates() {
        let store = gcpt_store();
        let cw = build(CrosswalkSource::Npp, &store, &RegionsConfig::default());
        assert_eq!(cw.len(), 2);
        let names = cw.table.column("project_name").unwrap();
        assert!(names.iter().all(|v| v.as_str() == Some("Mundra")));
    }

    #[test]
    fn crosswalk_rows_always_have_valid_coordinates() {
        let store = gcpt_store();
        let outcome = build_all(&store, &CrosswalkSource::ALL, &RegionsConfig::default());
        for cw in &outcome.built {
            for i in 0..cw.len() {
                let lat = cw.table.get(i, "latitude").and_then(Value::as_f64);
                let lon = cw.table.get(i, "longitude").and_then(Value::as_f64);
                assert!(crate::coords::validate_coordinates(lat, lon), "{} row {i}", cw.source);
            }
        }
    }

    #[test]
    fn build_all_skips_empty_sources() {
        let store = gcpt_store();
        let regions = RegionsConfig {
            npp: RegionConfig::new(&["Chile"]),
            ..RegionsConfig::default()
        };
        let outcome = build_all(&store, &CrosswalkSource::ALL, &regions);
        let built: Vec<CrosswalkSource> = outcome.built.iter().map(|c| c.source).collect();
        assert_eq!(built, vec![CrosswalkSource::Eia, CrosswalkSource::Entsoe]);
        assert_eq!(outcome.skipped, vec![CrosswalkSource::Npp]);
    }

    #[test]
    fn empty_store_builds_nothing() {
        let store = ReferenceStore::new(MemorySource::empty());
        let outcome = build_all(&store, &CrosswalkSource::ALL, &RegionsConfig::default());
        assert!(outcome.built.is_empty());
        assert_eq!(outcome.skipped.len(), 3);
    }

    #[test]
    fn dedup_treats_nulls_as_equal() {
        let table = Table::from_rows(
            vec!["project_name".into(), "unit_name".into(), "n".into()],
            vec![
                vec!["A".into(), Value::Null, 1.0.into()],
                vec!["A".into(), Value::Null, 2.0.into()],
                vec!["A".into(), "U1".into(), 3.0.into()],
            ],
        );
        let out = dedup_name_unit(&table);
        assert_eq!(out.len(), 2);
        assert_eq!(out.get(0, "n"), Some(&Value::Number(1.0)));
    }

    fn keyed(keys: &[(Option<u8>, Option<u8>)]) -> Table {
        let cell = |k: &Option<u8>| k.map(|v| Value::text(v.to_string())).unwrap_or(Value::Null);
        Table::from_rows(
            vec!["project_name".into(), "unit_name".into()],
            keys.iter().map(|(p, u)| vec![cell(p), cell(u)]).collect(),
        )
    }

    proptest! {
        #[test]
        fn dedup_is_idempotent(keys in proptest::collection::vec((proptest::option::of(0u8..4), proptest::option::of(0u8..3)), 0..40)) {
            let once = dedup_name_unit(&keyed(&keys));
            let twice = dedup_name_unit(&once);
            prop_assert_eq!(&once, &twice);

            let mut seen = HashSet::new();
            for row in once.rows() {
                prop_assert!(seen.insert((row[0].to_text(), row[1].to_text())));
            }
        }
    }
}
