// Command-line surface of esg-engine
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;
use shared::models::EmissionsSubmission;
use shared::{parse_date_range, ValidationError};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "esg-engine", version, about = "ESG emissions data validation and storage")]
pub struct Cli {
    /// JSON file overlaid on the built-in configuration.
    #[arg(long, global = true, env = "ESG_ENGINE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Import emissions readings from one or more CSV files.
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Submit a single reading and print the result as JSON.
    Submit(SubmitArgs),
    /// Print per-scope totals for an organization.
    Summary(SummaryArgs),
    /// Print one stored record as JSON.
    Show { id: Uuid },
    /// Format a number the way emissions values are displayed.
    Format {
        #[arg(allow_hyphen_values = true)]
        value: f64,
    },
    /// Check that START does not come after END.
    CheckRange { start: String, end: String },
}

#[derive(Debug, Parser)]
pub struct SubmitArgs {
    #[arg(long = "org")]
    pub organization_id: String,

    /// scope1, scope2 or scope3.
    #[arg(long)]
    pub scope: String,

    /// Read as JSON, so `12.5` is a number and `"12.5"` a string.
    #[arg(long, allow_hyphen_values = true)]
    pub value: String,

    #[arg(long)]
    pub unit: Option<String>,

    #[arg(long)]
    pub start: String,

    #[arg(long)]
    pub end: String,
}

#[derive(Debug, Parser)]
pub struct SummaryArgs {
    #[arg(long = "org")]
    pub organization_id: String,

    #[arg(long, requires = "end")]
    pub start: Option<String>,

    #[arg(long, requires = "start")]
    pub end: Option<String>,
}

impl SubmitArgs {
    /// Fails only on an unknown scope. A value that is not valid JSON is
    /// passed on as text for the validator to reject.
    pub fn into_submission(self) -> Result<EmissionsSubmission, ValidationError> {
        let value = serde_json::from_str::<Value>(&self.value).unwrap_or(Value::String(self.value));
        Ok(EmissionsSubmission {
            organization_id: self.organization_id,
            scope: self.scope.parse()?,
            value,
            unit: self.unit,
            period_start: self.start,
            period_end: self.end,
        })
    }
}

/// Outcome of `check-range`: the line to print and whether the range holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeCheck {
    pub valid: bool,
    pub message: String,
}

impl RangeCheck {
    pub fn run(start: &str, end: &str) -> Self {
        match parse_date_range(start, end) {
            Ok(_) => Self {
                valid: true,
                message: "valid".to_string(),
            },
            Err(e) => Self {
                valid: false,
                message: format!("invalid: {}", e),
            },
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.valid {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}
