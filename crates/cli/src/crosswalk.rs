//! `plantgeo build`, `plantgeo load-db` and `plantgeo download`.

use std::path::{Path, PathBuf};

use log::{info, warn};
use plantgeo_io::reference::{find_newest, GCPT_CSV_PATTERN};
use plantgeo_io::{csv, load_crosswalk, save_outcome, sqlite, GcptDirectory, LoadReport};
use plantgeo_recon::{build_all, CrosswalkSource, ReconConfig, ReferenceStore};

use crate::exit_codes::EXIT_EMPTY_CROSSWALKS;
use crate::{CliError, SourceArg};

const GCPT_DOWNLOAD_URL: &str =
    "https://globalenergymonitor.org/projects/global-coal-plant-tracker/download-data/";

// ============================================================================
// build
// ============================================================================

pub fn cmd_build(
    config: &ReconConfig,
    source: SourceArg,
    output_dir: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let gcpt = GcptDirectory::new(&config.data_dir);
    let reference_file = gcpt
        .find_file()
        .map_err(|e| CliError::no_reference(e.to_string()))?
        .ok_or_else(|| {
            CliError::no_reference(format!("no GCPT file found in {}", config.data_dir.display()))
        })?;

    let store = ReferenceStore::new(gcpt);
    if store.load().is_empty() {
        return Err(CliError::no_reference(format!(
            "could not load GCPT data from {}",
            reference_file.display()
        )));
    }

    let outcome = build_all(&store, &source.sources(), &config.regions);
    if outcome.built.is_empty() {
        return Err(CliError {
            code: EXIT_EMPTY_CROSSWALKS,
            message: "no crosswalk produced any rows".to_string(),
            hint: Some("check the country lists under [regions] and the GCPT column headers".to_string()),
        });
    }

    let dir = output_dir.unwrap_or_else(|| config.crosswalk_dir.clone());
    let report = save_outcome(&dir, &outcome, Some(reference_file.as_path()))
        .map_err(|e| CliError::output(e.to_string()))?;
    info!("Crosswalk building complete");

    if json {
        let out = serde_json::to_string_pretty(&report).map_err(|e| CliError::output(e.to_string()))?;
        println!("{out}");
    } else {
        for entry in &report.crosswalks {
            println!("  OK  {}: {} records -> {}", entry.source, entry.records, dir.join(&entry.file).display());
        }
        for skipped in &report.skipped {
            println!("  SKIP  {skipped} (no data)");
        }
    }
    Ok(())
}

// ============================================================================
// load-db
// ============================================================================

pub fn cmd_load_db(config: &ReconConfig, db: &Path, skip_gcpt: bool, json: bool) -> Result<(), CliError> {
    if let Some(parent) = db.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| CliError::db(format!("cannot create {}: {e}", parent.display())))?;
    }
    let mut conn = sqlite::open(db).map_err(|e| CliError::db(e.to_string()))?;

    let mut reports: Vec<LoadReport> = Vec::new();
    let mut skipped: Vec<String> = Vec::new();
    for source in CrosswalkSource::ALL {
        let Some(table) = load_crosswalk(&config.crosswalk_dir, source) else {
            skipped.push(format!("{} not found", source.file_name()));
            continue;
        };
        let report = sqlite::load_crosswalk_table(&mut conn, source, &table)
            .map_err(|e| CliError::db(e.to_string()))?;
        reports.push(report);
    }

    if skip_gcpt {
        skipped.push(format!("{} (--skip-gcpt)", sqlite::GCPT_GLOBAL_TABLE));
    } else {
        match find_newest(&config.data_dir, GCPT_CSV_PATTERN).map_err(|e| CliError::input(e.to_string()))? {
            Some(path) => {
                info!("Loading {} from {}", sqlite::GCPT_GLOBAL_TABLE, path.display());
                let table = csv::read_table(&path).map_err(|e| CliError::input(e.to_string()))?;
                let report = sqlite::load_gcpt_global(&mut conn, &table)
                    .map_err(|e| CliError::db(e.to_string()))?;
                reports.push(report);
            }
            None => skipped.push(format!("{GCPT_CSV_PATTERN} not found in {}", config.data_dir.display())),
        }
    }

    if reports.is_empty() {
        warn!("Nothing loaded into {}", db.display());
    }

    if json {
        let out = serde_json::to_string_pretty(&serde_json::json!({
            "database": db.display().to_string(),
            "tables": reports,
            "skipped": skipped,
        }))
        .map_err(|e| CliError::output(e.to_string()))?;
        println!("{out}");
    } else {
        for report in &reports {
            println!("  OK  {}: {} rows", report.table, report.rows);
            if report.dropped > 0 {
                println!("  INFO  {}: dropped {} rows", report.table, report.dropped);
            }
        }
        for reason in &skipped {
            println!("  SKIP  {reason}");
        }
    }
    Ok(())
}

// ============================================================================
// download
// ============================================================================

pub fn cmd_download(config: &ReconConfig) -> Result<(), CliError> {
    let dir = &config.data_dir;
    std::fs::create_dir_all(dir)
        .map_err(|e| CliError::output(format!("cannot create {}: {e}", dir.display())))?;

    println!("Global Coal Plant Tracker (GCPT) download");
    println!();
    println!("The GCPT workbook must be downloaded manually from Global Energy Monitor:");
    println!();
    println!("1. Visit {GCPT_DOWNLOAD_URL}");
    println!("2. Agree to the terms of use (CC BY 4.0)");
    println!("3. Download the Excel file (GCPT database)");
    println!("4. Save it to {} as gcpt_global_<year>.xlsx, e.g. gcpt_global_2025.xlsx", dir.display());
    println!("5. Build the crosswalks: plantgeo build");
    println!();

    let existing = GcptDirectory::new(dir)
        .list_data_files()
        .map_err(|e| CliError::input(e.to_string()))?;
    if existing.is_empty() {
        println!("No GCPT files found in {}", dir.display());
    } else {
        println!("Existing files in {}:", dir.display());
        for path in existing {
            if let Some(name) = path.file_name() {
                println!("  - {}", name.to_string_lossy());
            }
        }
    }
    Ok(())
}
