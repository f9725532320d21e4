use chrono::NaiveDate;

#[derive(Debug, thiserror::Error)]
pub enum PriceError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("No data for current selection: {category}")]
    EmptyView { category: String },

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl PriceError {
    /// Whether the host can recover by asking the user for a new selection.
    ///
    /// Range and empty-view errors are recoverable; everything else means the
    /// data itself could not be loaded or queried.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PriceError::InvalidRange { .. } | PriceError::EmptyView { .. })
    }

    /// Fold any load-time failure into [`PriceError::Parse`].
    pub(crate) fn into_parse(self) -> PriceError {
        match self {
            PriceError::Parse(msg) => PriceError::Parse(msg),
            other => PriceError::Parse(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PriceError>;
