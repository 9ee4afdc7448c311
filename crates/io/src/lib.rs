// File I/O operations

pub mod crosswalks;
pub mod csv;
pub mod error;
pub mod reference;
pub mod sqlite;
pub mod xlsx;

use std::path::Path;

use plantgeo_recon::Table;

pub use crosswalks::{load_crosswalk, save_crosswalk, save_outcome, BuildReport};
pub use error::IoError;
pub use reference::GcptDirectory;
pub use sqlite::LoadReport;

/// Sheet name used when writing xlsx output.
pub const OUTPUT_SHEET: &str = "Sheet1";

fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Read a table from a delimited text file or the first sheet of a workbook,
/// dispatching on the file extension.
pub fn read_table_file(path: &Path) -> Result<Table, IoError> {
    match extension(path).as_str() {
        "csv" | "tsv" | "txt" => csv::read_table(path),
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => xlsx::read_first_sheet(path),
        _ => Err(IoError::Unsupported(path.to_path_buf())),
    }
}

/// Write a table as CSV or xlsx depending on the extension.
pub fn write_table_file(table: &Table, path: &Path) -> Result<(), IoError> {
    match extension(path).as_str() {
        "csv" => csv::write_table(table, path),
        "xlsx" => xlsx::write_table(table, path, OUTPUT_SHEET),
        _ => Err(IoError::Unsupported(path.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plantgeo_recon::Value;
    use tempfile::tempdir;

    #[test]
    fn test_dispatch_by_extension() {
        let dir = tempdir().unwrap();
        let table = Table::from_rows(
            vec!["plant_name".into(), "country".into()],
            vec![vec!["Drax".into(), "United Kingdom".into()]],
        );
        for name in ["plants.csv", "plants.xlsx"] {
            let path = dir.path().join(name);
            write_table_file(&table, &path).unwrap();
            let back = read_table_file(&path).unwrap();
            assert_eq!(back.get(0, "plant_name"), Some(&Value::text("Drax")));
        }
    }

    #[test]
    fn test_unsupported_extension() {
        let path = Path::new("plants.parquet");
        assert!(matches!(read_table_file(path), Err(IoError::Unsupported(_))));
        let table = Table::default();
        assert!(matches!(write_table_file(&table, path), Err(IoError::Unsupported(_))));
    }
}
