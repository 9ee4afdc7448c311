use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (cutoff out of range, empty region, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// Required column absent from an input table.
    #[error("missing column '{column}'")]
    MissingColumn { column: String },
    /// Reference data could not be read (corrupt file, unsupported format).
    #[error("load error: {0}")]
    Load(String),
    /// IO error (file read, etc.).
    #[error("IO error: {0}")]
    Io(String),
}
