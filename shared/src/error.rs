use thiserror::Error;

/// Failure kinds of the narrowing, parsing and formatting functions.
///
/// The boolean predicates (`validate_*`) never produce these; they answer
/// `false` instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid emissions value: {0}")]
    InvalidEmissionsValue(String),

    #[error("Invalid date range: end {end} precedes start {start}")]
    InvertedDateRange { start: String, end: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
