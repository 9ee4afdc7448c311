use std::path::PathBuf;

use plantgeo_recon::ReconError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Excel error: {0}")]
    Excel(#[from] calamine::Error),
    #[error("Excel write error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("{table}: missing key column '{column}'")]
    MissingColumn { table: String, column: String },
    #[error("{} contains no sheets", .0.display())]
    NoSheets(PathBuf),
    #[error("unsupported file type: {}", .0.display())]
    Unsupported(PathBuf),
}

impl From<IoError> for ReconError {
    fn from(e: IoError) -> Self {
        match e {
            IoError::Read { .. } | IoError::Write { .. } => ReconError::Io(e.to_string()),
            other => ReconError::Load(other.to_string()),
        }
    }
}
