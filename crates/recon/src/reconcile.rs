//! Batch Reconciler: attach GCPT coordinates to every row of an external table.

use std::collections::HashMap;

use log::{info, warn};
use serde::Serialize;

use crate::matcher::{CoordinateMatcher, MatchOptions};
use crate::model::PlantRecord;
use crate::table::{Table, Value};

pub const GCPT_LATITUDE: &str = "gcpt_latitude";
pub const GCPT_LONGITUDE: &str = "gcpt_longitude";
pub const GCPT_MATCH_SCORE: &str = "gcpt_match_score";
pub const GCPT_MATCHED_NAME: &str = "gcpt_matched_name";

/// Columns appended to the input, in this order.
pub const OUTPUT_COLUMNS: [&str; 4] = [
    GCPT_LATITUDE,
    GCPT_LONGITUDE,
    GCPT_MATCH_SCORE,
    GCPT_MATCHED_NAME,
];

const ID_MATCH_SCORE: f64 = 100.0;

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub name_column: String,
    /// Per-row country filter. Blank cells mean "any country".
    pub country_column: Option<String>,
    /// Composite-id column resolved by exact lookup before fuzzy matching.
    pub id_column: Option<String>,
    /// Only the cutoff is used; each row takes its single best match.
    pub match_options: MatchOptions,
}

impl ReconcileOptions {
    pub fn new(name_column: impl Into<String>) -> Self {
        Self {
            name_column: name_column.into(),
            country_column: None,
            id_column: None,
            match_options: MatchOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub rows: usize,
    pub matched: usize,
    pub matched_by_id: usize,
    pub matched_by_name: usize,
}

#[derive(Debug, Clone)]
pub struct ReconcileOutput {
    pub table: Table,
    pub summary: ReconcileSummary,
}

#[derive(Debug, Clone)]
struct Hit {
    latitude: Option<f64>,
    longitude: Option<f64>,
    score: f64,
    matched_name: Option<String>,
}

impl Hit {
    fn from_record(record: &PlantRecord, score: f64, matched_name: Option<String>) -> Self {
        Self {
            latitude: record.latitude,
            longitude: record.longitude,
            score,
            matched_name,
        }
    }
}

/// Copy `input` and append the four `gcpt_*` columns.
///
/// Row order and the original columns are untouched, except that a `gcpt_*`
/// column already in the input is overwritten in place. Rows without a match
/// get nulls. With an id column, an exact id hit wins and the row is not
/// fuzzy-matched.
pub fn reconcile_table(
    matcher: &CoordinateMatcher<'_>,
    input: &Table,
    options: &ReconcileOptions,
) -> ReconcileOutput {
    let mut hits: Vec<Option<Hit>> = vec![None; input.len()];
    let mut summary = ReconcileSummary {
        rows: input.len(),
        ..ReconcileSummary::default()
    };

    match input.column_index(&options.name_column) {
        None => warn!(
            "Name column '{}' not found; no rows matched",
            options.name_column
        ),
        Some(name_col) => {
            if let Some(id_column) = &options.id_column {
                summary.matched_by_id = resolve_ids(matcher, input, id_column, &mut hits);
            }
            summary.matched_by_name = resolve_names(matcher, input, name_col, options, &mut hits);
        }
    }
    summary.matched = summary.matched_by_id + summary.matched_by_name;

    let mut table = input.clone();
    let column = |f: fn(&Hit) -> Value| -> Vec<Value> {
        hits.iter()
            .map(|h| h.as_ref().map(f).unwrap_or(Value::Null))
            .collect()
    };
    let outputs = [
        column(|h| Value::from_opt_f64(h.latitude)),
        column(|h| Value::from_opt_f64(h.longitude)),
        column(|h| Value::number(h.score)),
        column(|h| Value::from_opt_str(h.matched_name.as_deref())),
    ];
    for (name, values) in OUTPUT_COLUMNS.into_iter().zip(outputs) {
        if table.set_column(name, values) {
            warn!("Input already has a '{name}' column; overwriting it");
        }
    }

    info!("Matched {}/{} rows to coordinates", summary.matched, summary.rows);
    ReconcileOutput { table, summary }
}

fn resolve_ids(
    matcher: &CoordinateMatcher<'_>,
    input: &Table,
    id_column: &str,
    hits: &mut [Option<Hit>],
) -> usize {
    let Some(id_col) = input.column_index(id_column) else {
        warn!("Id column '{id_column}' not found; skipping exact id lookup");
        return 0;
    };

    let row_ids: Vec<Option<String>> = input
        .rows()
        .iter()
        .map(|row| row[id_col].to_text().map(|s| s.trim().to_string()))
        .collect();
    let mut unique: Vec<&str> = row_ids.iter().flatten().map(String::as_str).collect();
    unique.sort_unstable();
    unique.dedup();

    let matched = matcher.match_ids(&unique);
    let mut by_id: HashMap<&str, &PlantRecord> = HashMap::new();
    for record in matched.records() {
        if let Some(id) = record.eia_plant_unit_id.as_deref() {
            by_id.entry(id).or_insert(record);
        }
    }

    let mut resolved = 0;
    for (hit, id) in hits.iter_mut().zip(&row_ids) {
        let Some(record) = id.as_deref().and_then(|id| by_id.get(id)) else {
            continue;
        };
        *hit = Some(Hit::from_record(record, ID_MATCH_SCORE, record.project_name.clone()));
        resolved += 1;
    }
    resolved
}

fn resolve_names(
    matcher: &CoordinateMatcher<'_>,
    input: &Table,
    name_col: usize,
    options: &ReconcileOptions,
    hits: &mut [Option<Hit>],
) -> usize {
    let country_col = match &options.country_column {
        Some(name) => {
            let index = input.column_index(name);
            if index.is_none() {
                warn!("Country column '{name}' not found; matching without country filter");
            }
            index
        }
        None => None,
    };

    // Group pending rows by country so each filtered pool is built once.
    let mut groups: Vec<(Option<String>, Vec<usize>)> = Vec::new();
    let mut group_of: HashMap<Option<String>, usize> = HashMap::new();
    for (i, row) in input.rows().iter().enumerate() {
        if hits[i].is_some() {
            continue;
        }
        let country = country_col.and_then(|c| row[c].to_text());
        let slot = *group_of.entry(country.clone()).or_insert_with(|| {
            groups.push((country, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(i);
    }

    let single = MatchOptions {
        limit: 1,
        ..options.match_options
    };

    let mut resolved = 0;
    for (country, rows) in &groups {
        let countries: Vec<&str> = country.as_deref().into_iter().collect();
        let reference = matcher.reference(&countries);
        let Some(pool) = matcher.pool(&reference) else {
            continue;
        };
        for &i in rows {
            let Some(name) = input.rows()[i][name_col].to_text() else {
                continue;
            };
            let results = matcher.match_in(&pool, &[name.as_str()], &single);
            if let Some(best) = results.first() {
                hits[i] = Some(Hit {
                    latitude: best.latitude,
                    longitude: best.longitude,
                    score: best.score,
                    matched_name: Some(best.matched_name.clone()),
                });
                resolved += 1;
            }
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::gcpt_store;

    fn input() -> Table {
        Table::from_rows(
            vec!["plant".into(), "country".into(), "eia_id".into()],
            vec![
                vec!["Colstrip".into(), "United States".into(), Value::Null],
                vec!["Mundra".into(), "India".into(), Value::Null],
                vec!["NonexistentPlant".into(), Value::Null, Value::Null],
                vec!["Belchatow".into(), "India".into(), Value::Null],
                vec![Value::Null, "Poland".into(), Value::Null],
                vec!["Colstrip".into(), "United States".into(), "4941|1".into()],
            ],
        )
    }

    fn options() -> ReconcileOptions {
        let mut options = ReconcileOptions::new("plant");
        options.country_column = Some("country".into());
        options.match_options.score_cutoff = 90.0;
        options
    }

    #[test]
    fn appends_four_columns_and_preserves_input() {
        let store = gcpt_store();
        let matcher = CoordinateMatcher::new(&store);
        let input = input();
        let before = input.clone();
        let out = reconcile_table(&matcher, &input, &options());

        assert_eq!(input, before);
        assert_eq!(out.table.len(), input.len());
        assert_eq!(&out.table.columns()[..3], input.columns());
        assert_eq!(&out.table.columns()[3..], &OUTPUT_COLUMNS);
        for (i, row) in out.table.rows().iter().enumerate() {
            assert_eq!(&row[..3], input.rows()[i].as_slice());
        }
    }

    #[test]
    fn existing_output_columns_are_overwritten() {
        let store = gcpt_store();
        let matcher = CoordinateMatcher::new(&store);
        let input = Table::from_rows(
            vec!["plant".into(), GCPT_LATITUDE.into()],
            vec![
                vec!["Colstrip".into(), "stale".into()],
                vec!["NonexistentPlant".into(), "stale".into()],
            ],
        );
        let mut options = ReconcileOptions::new("plant");
        options.match_options.score_cutoff = 90.0;
        let out = reconcile_table(&matcher, &input, &options);
        let t = &out.table;

        assert_eq!(t.columns().len(), 5);
        assert_eq!(t.columns().iter().filter(|c| *c == GCPT_LATITUDE).count(), 1);
        assert_eq!(t.column_index(GCPT_LATITUDE), Some(1));
        assert_eq!(t.get(0, GCPT_LATITUDE), Some(&Value::Number(45.88)));
        assert_eq!(t.get(1, GCPT_LATITUDE), Some(&Value::Null));
    }

    #[test]
    fn matched_rows_carry_coordinates() {
        let store = gcpt_store();
        let matcher = CoordinateMatcher::new(&store);
        let out = reconcile_table(&matcher, &input(), &options());
        let t = &out.table;

        assert_eq!(t.get(0, GCPT_LATITUDE), Some(&Value::Number(45.88)));
        assert_eq!(t.get(0, GCPT_LONGITUDE), Some(&Value::Number(-106.61)));
        assert_eq!(t.get(0, GCPT_MATCHED_NAME), Some(&Value::text("Colstrip Unit 1")));
        assert!(t.get(0, GCPT_MATCH_SCORE).and_then(Value::as_f64).unwrap() >= 90.0);

        assert_eq!(t.get(1, GCPT_MATCH_SCORE), Some(&Value::Number(100.0)));
        assert_eq!(t.get(1, GCPT_LATITUDE), Some(&Value::Number(22.82)));

        // No match, wrong country, null name.
        for row in [2, 3, 4] {
            for column in OUTPUT_COLUMNS {
                assert_eq!(t.get(row, column), Some(&Value::Null), "row {row} {column}");
            }
        }
        assert_eq!(out.summary.rows, 6);
        assert_eq!(out.summary.matched, 3);
        assert_eq!(out.summary.matched_by_id, 0);
    }

    #[test]
    fn exact_id_wins_over_fuzzy_name() {
        let store = gcpt_store();
        let matcher = CoordinateMatcher::new(&store);
        let mut options = options();
        options.id_column = Some("eia_id".into());
        let out = reconcile_table(&matcher, &input(), &options);

        assert_eq!(
            out.table.get(5, GCPT_MATCHED_NAME),
            Some(&Value::text("Navajo Generating Station Unit 1"))
        );
        assert_eq!(out.table.get(5, GCPT_MATCH_SCORE), Some(&Value::Number(100.0)));
        assert_eq!(out.table.get(5, GCPT_LATITUDE), Some(&Value::Number(36.90)));
        assert_eq!(out.summary.matched_by_id, 1);
        assert_eq!(out.summary.matched_by_name, 2);
        assert_eq!(out.summary.matched, 3);
    }

    #[test]
    fn without_country_column_matches_globally() {
        let store = gcpt_store();
        let matcher = CoordinateMatcher::new(&store);
        let mut options = options();
        options.country_column = None;
        let out = reconcile_table(&matcher, &input(), &options);
        // Belchatow now matches its Polish row.
        assert_eq!(out.table.get(3, GCPT_LATITUDE), Some(&Value::Number(51.26)));
        assert_eq!(out.summary.matched, 4);
    }

    #[test]
    fn missing_name_column_yields_null_columns() {
        let store = gcpt_store();
        let matcher = CoordinateMatcher::new(&store);
        let out = reconcile_table(&matcher, &input(), &ReconcileOptions::new("facility"));
        assert_eq!(out.table.width(), 7);
        assert!(out.table.rows().iter().all(|r| r[3..].iter().all(Value::is_null)));
        assert_eq!(out.summary.matched, 0);
    }

    #[test]
    fn empty_input_stays_empty() {
        let store = gcpt_store();
        let matcher = CoordinateMatcher::new(&store);
        let input = Table::new(vec!["plant".into()]);
        let out = reconcile_table(&matcher, &input, &ReconcileOptions::new("plant"));
        assert!(out.table.is_empty());
        assert_eq!(out.table.columns().len(), 5);
        assert_eq!(out.summary, ReconcileSummary::default());
    }
}
