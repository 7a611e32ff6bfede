use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Arrow error: {0}")]
    ArrowError(String),

    #[error("Date parsing error: {0}")]
    DateError(#[from] chrono::ParseError),

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Data error: {0}")]
    DataError(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

impl From<arrow_schema::ArrowError> for AnalysisError {
    fn from(e: arrow_schema::ArrowError) -> Self {
        AnalysisError::ArrowError(e.to_string())
    }
}
