//! `plantgeo match`, `plantgeo lookup-ids` and `plantgeo reconcile`.

use std::io::{self, Write};
use std::path::Path;

use plantgeo_io::{read_table_file, write_table_file, GcptDirectory};
use plantgeo_recon::{
    reconcile_table, CoordinateMatcher, MatchOptions, MatchResult, ReconConfig, ReconcileOptions,
    ReferenceStore, Table,
};

use crate::CliError;

pub struct ReconcileArgs {
    pub name_column: String,
    pub country_column: Option<String>,
    pub id_column: Option<String>,
}

/// Store over the configured data directory, loaded up front so a missing
/// workbook is reported once instead of as empty results.
fn open_store(config: &ReconConfig) -> Result<ReferenceStore, CliError> {
    let store = ReferenceStore::new(GcptDirectory::new(&config.data_dir));
    if store.load().is_empty() {
        return Err(CliError::no_reference(format!(
            "no GCPT data available in {}",
            config.data_dir.display()
        )));
    }
    Ok(store)
}

fn fmt_coord(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let out = serde_json::to_string_pretty(value).map_err(|e| CliError::output(e.to_string()))?;
    println!("{out}");
    Ok(())
}

// ============================================================================
// match
// ============================================================================

pub fn cmd_match(
    config: &ReconConfig,
    names: &[String],
    countries: &[String],
    json: bool,
) -> Result<(), CliError> {
    let store = open_store(config)?;
    let matcher = CoordinateMatcher::from_config(&store, &config.matching);
    let options = MatchOptions::from(&config.matching);

    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let countries: Vec<&str> = countries.iter().map(String::as_str).collect();
    let results = matcher.match_plant_names(&names, &countries, &options);

    if json {
        return print_json(&results);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for name in &names {
        let hits: Vec<&MatchResult> = results.iter().filter(|r| r.query_name == *name).collect();
        if hits.is_empty() {
            writeln!(out, "{name}: no match").map_err(|e| CliError::output(e.to_string()))?;
            continue;
        }
        for hit in hits {
            writeln!(
                out,
                "{name} -> {} [{}] score {:.1} at {}, {} ({})",
                hit.matched_name,
                hit.unit_name.as_deref().unwrap_or("-"),
                hit.score,
                fmt_coord(hit.latitude),
                fmt_coord(hit.longitude),
                hit.country.as_deref().unwrap_or("-"),
            )
            .map_err(|e| CliError::output(e.to_string()))?;
        }
    }
    Ok(())
}

// ============================================================================
// lookup-ids
// ============================================================================

pub fn cmd_lookup_ids(config: &ReconConfig, ids: &[String], json: bool) -> Result<(), CliError> {
    let store = open_store(config)?;
    let matcher = CoordinateMatcher::from_config(&store, &config.matching);

    let ids: Vec<&str> = ids.iter().map(|s| s.trim()).collect();
    let matched = matcher.match_ids(&ids);

    if json {
        return print_json(&matched.records());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for record in matched.records() {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}",
            record.eia_plant_unit_id.as_deref().unwrap_or("-"),
            record.project_name.as_deref().unwrap_or("-"),
            record.unit_name.as_deref().unwrap_or("-"),
            fmt_coord(record.latitude),
            fmt_coord(record.longitude),
        )
        .map_err(|e| CliError::output(e.to_string()))?;
    }

    for id in &ids {
        let found = matched
            .records()
            .iter()
            .any(|r| r.eia_plant_unit_id.as_deref() == Some(*id));
        if !found {
            eprintln!("note: no GCPT unit for id '{id}'");
        }
    }
    Ok(())
}

// ============================================================================
// reconcile
// ============================================================================

fn require_column(table: &Table, column: &str, input: &Path) -> Result<(), CliError> {
    if table.has_column(column) {
        return Ok(());
    }
    Err(CliError::input(format!("column '{column}' not found in {}", input.display()))
        .with_hint(format!("available columns: {}", table.columns().join(", "))))
}

pub fn cmd_reconcile(
    config: &ReconConfig,
    input: &Path,
    args: ReconcileArgs,
    output: Option<&Path>,
) -> Result<(), CliError> {
    let table = read_table_file(input).map_err(|e| CliError::input(e.to_string()))?;
    require_column(&table, &args.name_column, input)?;
    for column in [&args.country_column, &args.id_column].into_iter().flatten() {
        require_column(&table, column, input)?;
    }

    let store = open_store(config)?;
    let matcher = CoordinateMatcher::from_config(&store, &config.matching);
    let options = ReconcileOptions {
        name_column: args.name_column,
        country_column: args.country_column,
        id_column: args.id_column,
        match_options: MatchOptions::from(&config.matching),
    };
    let result = reconcile_table(&matcher, &table, &options);

    match output {
        Some(path) => {
            write_table_file(&result.table, path).map_err(|e| CliError::output(e.to_string()))?;
        }
        None => {
            plantgeo_io::csv::write_table_to(&result.table, io::stdout().lock())
                .map_err(|e| CliError::output(e.to_string()))?;
        }
    }

    let summary = result.summary;
    eprintln!(
        "matched {}/{} rows ({} by id, {} by name)",
        summary.matched, summary.rows, summary.matched_by_id, summary.matched_by_name
    );
    Ok(())
}
