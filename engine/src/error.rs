use shared::models::{SubmissionErrorKind, SubmissionResult};
use shared::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("CSV parsing system error: {source}")]
    CsvSystemError {
        #[from]
        source: csv::Error,
    },

    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    #[error("CSV data format error: {0}")]
    CsvDataFormatError(String),

    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal processing error: {0}")]
    ProcessingError(String),

    #[error(transparent)]
    AnyhowError(#[from] anyhow::Error),
}

impl EngineError {
    /// Which side of the save path failed, as reported to submitters.
    pub fn submission_kind(&self) -> SubmissionErrorKind {
        match self {
            EngineError::ValidationError(_) | EngineError::CsvDataFormatError(_) => {
                SubmissionErrorKind::Validation
            }
            _ => SubmissionErrorKind::Persistence,
        }
    }
}

impl From<EngineError> for SubmissionResult {
    fn from(err: EngineError) -> Self {
        tracing::debug!("Mapping EngineError to SubmissionResult: {:?}", err);
        SubmissionResult::rejected(err.submission_kind(), err.to_string())
    }
}
