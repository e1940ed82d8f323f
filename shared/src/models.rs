use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;

/// GHG Protocol scope of an emissions reading.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EmissionsScope {
    Scope1,
    Scope2,
    Scope3,
}

impl EmissionsScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scope1 => "scope1",
            Self::Scope2 => "scope2",
            Self::Scope3 => "scope3",
        }
    }
}

impl fmt::Display for EmissionsScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmissionsScope {
    type Err = ValidationError;

    // Accepts "scope1", "Scope 1", "scope_1" and a bare "1".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect();
        match normalized.trim_start_matches("scope") {
            "1" => Ok(Self::Scope1),
            "2" => Ok(Self::Scope2),
            "3" => Ok(Self::Scope3),
            _ => Err(ValidationError::InvalidArgument(format!(
                "Unknown emissions scope '{}'",
                s
            ))),
        }
    }
}

/// Reporting period. `start <= end` holds for every constructed value,
/// including deserialized ones.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawDateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = ValidationError;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        DateRange::new(raw.start, raw.end)
    }
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if !crate::utils::esg_validation::validate_date_range(&start, &end) {
            return Err(ValidationError::InvertedDateRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// True when `other` lies entirely inside this range (bounds inclusive).
    pub fn contains_range(&self, other: &DateRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// A persisted emissions reading (one `temporal_data` row).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmissionsRecord {
    pub id: Uuid,
    pub organization_id: String,
    pub scope: EmissionsScope,
    pub value: f64,
    pub unit: String,
    pub period: DateRange,
    pub recorded_at: DateTime<Utc>,
}

/// Unchecked payload as it arrives from a form, an API call or a CSV row.
/// `value` stays loosely typed until the validator narrows it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmissionsSubmission {
    pub organization_id: String,
    pub scope: EmissionsScope,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub period_start: String,
    pub period_end: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionErrorKind {
    /// The payload was rejected before anything was stored.
    Validation,
    /// The payload was valid but the storage collaborator failed.
    Persistence,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionError {
    pub kind: SubmissionErrorKind,
    pub message: String,
}

/// Outcome of a save, serialized as `{ "success": bool, "record_id"?, "error"? }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SubmissionError>,
}

impl SubmissionResult {
    pub fn stored(record_id: Uuid) -> Self {
        Self {
            success: true,
            record_id: Some(record_id),
            error: None,
        }
    }

    pub fn rejected(kind: SubmissionErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            record_id: None,
            error: Some(SubmissionError {
                kind,
                message: message.into(),
            }),
        }
    }
}
