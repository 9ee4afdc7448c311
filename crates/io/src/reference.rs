// GCPT file discovery

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use glob::Pattern;
use log::{info, warn};
use plantgeo_recon::{ReconError, ReferenceSource, Table};

use crate::error::IoError;
use crate::read_table_file;

/// Patterns tried in order. The first pattern with any match wins; within
/// it, the most recently modified file is chosen.
pub const GCPT_PATTERNS: [&str; 5] = [
    "gcpt_global_*.xlsx",
    "GCPT*.xlsx",
    "*GCPT*.xlsx",
    "gcpt_global_*.csv",
    "*EIA*GCPT*crosswalk*.xlsx",
];

/// Plain CSV export of the full tracker, loaded verbatim into `gcpt_global`.
pub const GCPT_CSV_PATTERN: &str = "gcpt_global_*.csv";

/// A directory holding a manually downloaded GCPT workbook.
#[derive(Debug, Clone)]
pub struct GcptDirectory {
    dir: PathBuf,
}

impl GcptDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The file `load` would read, if any.
    pub fn find_file(&self) -> Result<Option<PathBuf>, IoError> {
        for pattern in GCPT_PATTERNS {
            if let Some(path) = find_newest(&self.dir, pattern)? {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    /// Files with a spreadsheet or CSV extension, for status output.
    pub fn list_data_files(&self) -> Result<Vec<PathBuf>, IoError> {
        let mut files = Vec::new();
        for pattern in ["*.xlsx", "*.csv"] {
            files.extend(matching_files(&self.dir, pattern)?);
        }
        files.sort();
        Ok(files)
    }
}

impl ReferenceSource for GcptDirectory {
    fn describe(&self) -> String {
        self.dir.display().to_string()
    }

    fn read_table(&self) -> Result<Option<Table>, ReconError> {
        let Some(path) = self.find_file()? else {
            warn!("No GCPT file found in {}", self.dir.display());
            return Ok(None);
        };
        info!("Loading GCPT data from {}", path.display());
        Ok(Some(read_table_file(&path)?))
    }
}

/// Most recently modified regular file in `dir` matching `pattern`.
pub fn find_newest(dir: &Path, pattern: &str) -> Result<Option<PathBuf>, IoError> {
    let newest = matching_files(dir, pattern)?
        .into_iter()
        .map(|path| {
            let modified = std::fs::metadata(&path)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, path)
        })
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
        .map(|(_, path)| path);
    Ok(newest)
}

fn matching_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, IoError> {
    let full = format!("{}/{}", Pattern::escape(&dir.to_string_lossy()), pattern);
    Ok(glob::glob(&full)?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::time::Duration;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str, age_secs: u64) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "Project Name,Latitude\nDrax,53.74\n").unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();
        path
    }

    #[test]
    fn empty_directory_finds_nothing() {
        let dir = tempdir().unwrap();
        let source = GcptDirectory::new(dir.path());
        assert_eq!(source.find_file().unwrap(), None);
        assert!(source.read_table().unwrap().is_none());
    }

    #[test]
    fn earlier_pattern_wins_over_newer_file() {
        let dir = tempdir().unwrap();
        let preferred = touch(dir.path(), "gcpt_global_2024.xlsx", 500);
        touch(dir.path(), "GCPT_July_2025.xlsx", 10);
        let source = GcptDirectory::new(dir.path());
        assert_eq!(source.find_file().unwrap(), Some(preferred));
    }

    #[test]
    fn newest_file_wins_within_pattern() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "gcpt_global_2024.csv", 500);
        let newest = touch(dir.path(), "gcpt_global_2025.csv", 10);
        assert_eq!(find_newest(dir.path(), GCPT_CSV_PATTERN).unwrap(), Some(newest));
    }

    #[test]
    fn crosswalk_workbook_is_found() {
        let dir = tempdir().unwrap();
        let crosswalk = touch(dir.path(), "2024_EIA_GCPT_crosswalk_v2.xlsx", 10);
        touch(dir.path(), "notes.txt", 0);
        let source = GcptDirectory::new(dir.path());
        // Also matched by "*GCPT*.xlsx".
        assert_eq!(source.find_file().unwrap(), Some(crosswalk));
    }

    #[test]
    fn csv_export_is_loaded() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "gcpt_global_2025.csv", 0);
        let source = GcptDirectory::new(dir.path());
        let table = source.read_table().unwrap().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.columns()[0], "Project Name");
    }

    #[test]
    fn corrupt_workbook_is_load_error() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "gcpt_global_2025.xlsx", 0);
        let source = GcptDirectory::new(dir.path());
        assert!(matches!(source.read_table(), Err(ReconError::Load(_))));
    }

    #[test]
    fn list_data_files_sorted() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "b.xlsx", 0);
        touch(dir.path(), "a.csv", 0);
        let names: Vec<String> = GcptDirectory::new(dir.path())
            .list_data_files()
            .unwrap()
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        assert_eq!(names, vec!["a.csv", "b.xlsx"]);
    }
}
