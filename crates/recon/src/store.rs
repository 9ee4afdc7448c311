//! Reference Data Store: the cached, normalized GCPT table.
//!
//! The store never fails. A missing file, an unreadable file or an absent
//! column all degrade to an empty table plus a log line; callers tell success
//! from failure by looking at emptiness.

use std::cell::OnceCell;
use std::collections::HashSet;

use log::{error, info, warn};

use crate::config::RegionConfig;
use crate::error::ReconError;
use crate::model::PlantRecord;
use crate::schema::{normalize_columns, Field, Schema};
use crate::table::{Table, Value};

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Where raw reference rows come from.
///
/// `Ok(None)` means there is nothing to load (no file discovered); the
/// source is expected to have logged why.
pub trait ReferenceSource {
    fn describe(&self) -> String;
    fn read_table(&self) -> Result<Option<Table>, ReconError>;
}

/// A source backed by a table already in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    table: Option<Table>,
}

impl MemorySource {
    pub fn new(table: Table) -> Self {
        Self { table: Some(table) }
    }

    pub fn empty() -> Self {
        Self { table: None }
    }
}

impl ReferenceSource for MemorySource {
    fn describe(&self) -> String {
        "in-memory table".into()
    }

    fn read_table(&self) -> Result<Option<Table>, ReconError> {
        Ok(self.table.clone())
    }
}

// ---------------------------------------------------------------------------
// Normalized table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceTable {
    columns: Vec<String>,
    schema: Schema,
    records: Vec<PlantRecord>,
}

impl ReferenceTable {
    /// Normalize headers and coerce numeric columns of a raw table.
    pub fn from_table(mut table: Table) -> Self {
        normalize_columns(&mut table);
        let (columns, rows) = table.into_parts();
        let schema = Schema::from_columns(columns.as_slice());
        let fields: Vec<Option<Field>> = columns
            .iter()
            .map(|c| Field::from_canonical(c))
            .collect();

        let records = rows
            .into_iter()
            .map(|row| {
                let mut record = PlantRecord::default();
                for ((value, field), name) in row.into_iter().zip(&fields).zip(&columns) {
                    match field {
                        Some(field) => record.set(*field, &value),
                        None => {
                            record.extra.insert(name.clone(), value);
                        }
                    }
                }
                record
            })
            .collect();

        Self {
            columns,
            schema,
            records,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[PlantRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows whose `field` text is one of `values`.
    ///
    /// Empty when the table is empty or the column is absent.
    pub fn filter_in<S: AsRef<str>>(&self, field: Field, values: &[S]) -> ReferenceTable {
        if self.is_empty() || !self.schema.has(field) {
            return ReferenceTable::default();
        }
        let wanted: HashSet<&str> = values.iter().map(|v| v.as_ref()).collect();
        self.retain(|r| r.text(field).is_some_and(|t| wanted.contains(t)))
    }

    pub fn retain(&self, mut keep: impl FnMut(&PlantRecord) -> bool) -> ReferenceTable {
        ReferenceTable {
            columns: self.columns.clone(),
            schema: self.schema.clone(),
            records: self.records.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Back to a plain table, columns in load order.
    pub fn to_table(&self) -> Table {
        let rows = self
            .records
            .iter()
            .map(|r| {
                self.columns
                    .iter()
                    .map(|c| match Field::from_canonical(c) {
                        Some(field) => r.value(field),
                        None => r.extra.get(c).cloned().unwrap_or(Value::Null),
                    })
                    .collect()
            })
            .collect();
        Table::from_rows(self.columns.clone(), rows)
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Lazily loaded reference table, cached for the life of the store.
///
/// Each store owns its cache; there is no process-wide instance. A failed or
/// empty load is not cached, so the next `load` tries the source again.
pub struct ReferenceStore {
    source: Box<dyn ReferenceSource>,
    cache: OnceCell<ReferenceTable>,
    empty: ReferenceTable,
}

impl ReferenceStore {
    pub fn new(source: impl ReferenceSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            cache: OnceCell::new(),
            empty: ReferenceTable::default(),
        }
    }

    pub fn from_table(table: Table) -> Self {
        Self::new(MemorySource::new(table))
    }

    /// The full normalized table. Idempotent; reads the source at most once
    /// per successful load.
    pub fn load(&self) -> &ReferenceTable {
        if let Some(table) = self.cache.get() {
            return table;
        }
        match self.read() {
            Some(table) => self.cache.get_or_init(|| table),
            None => &self.empty,
        }
    }

    /// Drop the cache and read the source again.
    pub fn reload(&mut self) -> &ReferenceTable {
        self.cache = OnceCell::new();
        self.load()
    }

    pub fn is_loaded(&self) -> bool {
        self.cache.get().is_some()
    }

    fn read(&self) -> Option<ReferenceTable> {
        match self.source.read_table() {
            Ok(Some(raw)) => {
                let table = ReferenceTable::from_table(raw);
                info!("Loaded {} GCPT records from {}", table.len(), self.source.describe());
                Some(table)
            }
            Ok(None) => {
                error!("No GCPT data found ({})", self.source.describe());
                None
            }
            Err(e) => {
                error!("Error loading GCPT data from {}: {e}", self.source.describe());
                None
            }
        }
    }

    pub fn filter_by_country<S: AsRef<str>>(&self, countries: &[S]) -> ReferenceTable {
        self.load().filter_in(Field::Country, countries)
    }

    pub fn filter_by_status<S: AsRef<str>>(&self, statuses: &[S]) -> ReferenceTable {
        self.load().filter_in(Field::Status, statuses)
    }

    /// Rows whose composite external id is one of `ids`. Exact membership.
    pub fn records_for_ids<S: AsRef<str>>(&self, ids: &[S]) -> ReferenceTable {
        let table = self.load();
        if table.is_empty() || !table.schema().has(Field::ExternalId) {
            warn!("No {} data available", Field::ExternalId);
            return ReferenceTable::default();
        }
        table.filter_in(Field::ExternalId, ids)
    }

    /// Plants in the United States, the population the EIA ids cover.
    pub fn us_plants(&self) -> ReferenceTable {
        self.filter_by_country(&["United States"])
    }

    pub fn region_plants(&self, region: &RegionConfig) -> ReferenceTable {
        self.filter_by_country(region.countries.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn raw() -> Table {
        Table::from_rows(
            vec![
                "Project Name".into(),
                "Unit Name".into(),
                "Country/Area".into(),
                "Latitude".into(),
                "Longitude".into(),
                "Status".into(),
                "GEM unit ID".into(),
            ],
            vec![
                vec!["Colstrip".into(), "Unit 1".into(), "United States".into(), "45.88".into(), "-106.61".into(), "operating".into(), "G1".into()],
                vec!["Mundra".into(), "Unit 1".into(), "India".into(), "22.82".into(), "bad".into(), "operating".into(), "G2".into()],
                vec!["Belchatow".into(), "Unit 1".into(), "Poland".into(), Value::Number(51.26), Value::Number(19.33), "retired".into(), "G3".into()],
            ],
        )
    }

    struct CountingSource {
        reads: Rc<Cell<usize>>,
        table: Option<Table>,
    }

    impl ReferenceSource for CountingSource {
        fn describe(&self) -> String {
            "counting".into()
        }
        fn read_table(&self) -> Result<Option<Table>, ReconError> {
            self.reads.set(self.reads.get() + 1);
            Ok(self.table.clone())
        }
    }

    struct BrokenSource;

    impl ReferenceSource for BrokenSource {
        fn describe(&self) -> String {
            "broken".into()
        }
        fn read_table(&self) -> Result<Option<Table>, ReconError> {
            Err(ReconError::Load("corrupt workbook".into()))
        }
    }

    #[test]
    fn load_normalizes_and_coerces() {
        let store = ReferenceStore::from_table(raw());
        let t = store.load();
        assert_eq!(t.len(), 3);
        assert!(t.schema().has(Field::ProjectName));
        assert!(!t.schema().has(Field::ExternalId));
        assert_eq!(t.columns()[6], "GEM unit ID");
        assert_eq!(t.records()[0].latitude, Some(45.88));
        assert_eq!(t.records()[1].longitude, None);
        assert_eq!(t.records()[0].extra.get("GEM unit ID"), Some(&Value::text("G1")));
    }

    #[test]
    fn load_is_cached_until_reload() {
        let reads = Rc::new(Cell::new(0));
        let mut store = ReferenceStore::new(CountingSource {
            reads: reads.clone(),
            table: Some(raw()),
        });
        store.load();
        store.load();
        store.filter_by_country(&["India"]);
        assert_eq!(reads.get(), 1);
        store.reload();
        assert_eq!(reads.get(), 2);
    }

    #[test]
    fn missing_source_is_retried() {
        let reads = Rc::new(Cell::new(0));
        let store = ReferenceStore::new(CountingSource {
            reads: reads.clone(),
            table: None,
        });
        assert!(store.load().is_empty());
        assert!(store.load().is_empty());
        assert_eq!(reads.get(), 2);
        assert!(!store.is_loaded());
    }

    #[test]
    fn load_failure_yields_empty_table() {
        let store = ReferenceStore::new(BrokenSource);
        assert!(store.load().is_empty());
        assert!(store.filter_by_country(&["India"]).is_empty());
    }

    #[test]
    fn filters_by_country_and_status() {
        let store = ReferenceStore::from_table(raw());
        let india = store.filter_by_country(&["India"]);
        assert_eq!(india.len(), 1);
        assert_eq!(india.records()[0].project_name.as_deref(), Some("Mundra"));
        assert_eq!(store.filter_by_status(&["operating"]).len(), 2);
        assert!(store.filter_by_country(&["Chile"]).is_empty());
    }

    #[test]
    fn us_plants_keeps_united_states_rows() {
        let store = ReferenceStore::from_table(raw());
        let us = store.us_plants();
        assert_eq!(us.len(), 1);
        assert_eq!(us.records()[0].project_name.as_deref(), Some("Colstrip"));
    }

    #[test]
    fn absent_column_filters_to_empty() {
        let store = ReferenceStore::from_table(raw());
        assert!(store.records_for_ids(&["6076|1"]).is_empty());
    }

    #[test]
    fn to_table_restores_columns() {
        let store = ReferenceStore::from_table(raw());
        let t = store.load().to_table();
        assert_eq!(t.columns()[0], "project_name");
        assert_eq!(t.get(2, "latitude"), Some(&Value::Number(51.26)));
        assert_eq!(t.get(0, "GEM unit ID"), Some(&Value::text("G1")));
    }
}
