use thiserror::Error;

pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors raised by ingestion, training, persistence and projection.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Failed to read CSV data: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to (de)serialize artifact: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Required column '{0}' is missing from the dataset header")]
    MissingColumn(&'static str),

    #[error("Dataset is empty: {0}")]
    EmptyDataset(String),

    #[error("No observations found for city '{0}'")]
    NoObservations(String),

    #[error("Observation for '{city}' on {date} has no '{field}' reading")]
    MissingReading {
        city: String,
        date: chrono::NaiveDate,
        field: &'static str,
    },

    #[error("Feature schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Invalid model artifact: {0}")]
    Artifact(String),
}
