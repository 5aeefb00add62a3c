use thiserror::Error;

/// Result alias for the pure table operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// A source file does not carry every column its dashboard needs.
///
/// Fatal at load time: the dashboard stays empty until another file is
/// opened.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("missing required columns: {}", .missing.join(", "))]
pub struct SchemaError {
    pub missing: Vec<String>,
}

/// Misuse of the filter / aggregate / export operations.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("unknown metric '{0}'")]
    UnknownMetric(String),

    #[error("invalid interval: lower bound {lo} exceeds upper bound {hi}")]
    InvalidInterval { lo: String, hi: String },

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
}
