// Crosswalk persistence

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use plantgeo_recon::{BuildOutcome, Crosswalk, CrosswalkSource, Table};
use serde::Serialize;

use crate::csv::{read_table, write_table};
use crate::error::IoError;

pub const BUILD_REPORT_FILE: &str = "build_report.json";

pub fn crosswalk_path(dir: &Path, source: CrosswalkSource) -> PathBuf {
    dir.join(source.file_name())
}

/// Write one crosswalk to `<dir>/<source>_plant_coordinates.csv`, replacing
/// any previous file.
pub fn save_crosswalk(dir: &Path, crosswalk: &Crosswalk) -> Result<PathBuf, IoError> {
    ensure_dir(dir)?;
    let path = crosswalk_path(dir, crosswalk.source);
    write_table(&crosswalk.table, &path)?;
    info!("Saved {} records to {}", crosswalk.len(), path.display());
    Ok(path)
}

/// Load a previously built crosswalk. Missing or unreadable files are logged
/// and yield `None`.
pub fn load_crosswalk(dir: &Path, source: CrosswalkSource) -> Option<Table> {
    let path = crosswalk_path(dir, source);
    if !path.exists() {
        warn!("Crosswalk file not found: {}", path.display());
        return None;
    }
    match read_table(&path) {
        Ok(table) => {
            info!("Loaded {} records from {}", table.len(), source.file_name());
            Some(table)
        }
        Err(e) => {
            error!("Error loading crosswalk {}: {e}", source.file_name());
            None
        }
    }
}

fn ensure_dir(dir: &Path) -> Result<(), IoError> {
    std::fs::create_dir_all(dir).map_err(|source| IoError::Write {
        path: dir.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Build report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub built_at: DateTime<Utc>,
    /// Reference file the crosswalks were derived from.
    pub reference_file: Option<String>,
    pub crosswalks: Vec<BuildReportEntry>,
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildReportEntry {
    pub source: String,
    pub file: String,
    pub records: usize,
}

impl BuildReport {
    pub fn new(outcome: &BuildOutcome, reference_file: Option<&Path>) -> Self {
        Self {
            built_at: Utc::now(),
            reference_file: reference_file.map(|p| p.display().to_string()),
            crosswalks: outcome
                .built
                .iter()
                .map(|c| BuildReportEntry {
                    source: c.source.name().to_string(),
                    file: c.source.file_name(),
                    records: c.len(),
                })
                .collect(),
            skipped: outcome.skipped.iter().map(|s| s.name().to_string()).collect(),
        }
    }
}

/// Persist every built crosswalk plus `build_report.json`. Skipped sources
/// leave their previous file, if any, untouched.
pub fn save_outcome(
    dir: &Path,
    outcome: &BuildOutcome,
    reference_file: Option<&Path>,
) -> Result<BuildReport, IoError> {
    ensure_dir(dir)?;
    for crosswalk in &outcome.built {
        save_crosswalk(dir, crosswalk)?;
    }

    let report = BuildReport::new(outcome, reference_file);
    let path = dir.join(BUILD_REPORT_FILE);
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&path, json).map_err(|source| IoError::Write { path, source })?;
    Ok(report)
}
