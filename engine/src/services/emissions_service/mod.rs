// Emissions data service: the save path for readings plus import and reporting.
mod helpers;
mod import_csv;
mod submit;
mod summarize;

pub use helpers::build_record;
pub use import_csv::{ImportSummary, RejectedRow};
pub use summarize::{EmissionsSummary, ScopeTotal, UnitTotal};

use shared::models::{DateRange, EmissionsRecord, EmissionsSubmission, SubmissionResult};
use shared::NumberFormat;
use std::path::Path;
use uuid::Uuid;

use crate::config::EngineSettings;
use crate::data::csv_import::EmissionsCsvReader;
use crate::data::store::SharedStore;
use crate::error::EngineError;

pub struct EmissionsService {
    store: SharedStore,
    csv_reader: EmissionsCsvReader,
    default_unit: String,
    number_format: NumberFormat,
}

impl EmissionsService {
    pub fn new(store: SharedStore, settings: &EngineSettings) -> Result<Self, EngineError> {
        Ok(Self {
            store,
            csv_reader: EmissionsCsvReader::new(settings.csv_delimiter)?,
            default_unit: settings.default_unit.clone(),
            number_format: settings.number_format,
        })
    }

    /// Validates and stores one reading. Never fails outright: the result says
    /// whether the payload was rejected or the store failed.
    pub async fn submit(&self, submission: EmissionsSubmission) -> SubmissionResult {
        tracing::info!(
            organization_id = %submission.organization_id,
            scope = %submission.scope,
            "Received emissions submission"
        );
        submit::handle_submit(submission, self.store.clone(), &self.default_unit).await
    }

    pub async fn import_csv(&self, path: &Path) -> Result<ImportSummary, EngineError> {
        tracing::info!(path = %path.display(), "Importing emissions CSV");
        import_csv::handle_import_csv(path, &self.csv_reader, self.store.clone(), &self.default_unit).await
    }

    pub async fn summarize(
        &self,
        organization_id: &str,
        period: Option<DateRange>,
    ) -> Result<EmissionsSummary, EngineError> {
        summarize::handle_summarize(organization_id, period, self.store.clone(), &self.number_format).await
    }

    pub async fn record(&self, id: &Uuid) -> Result<EmissionsRecord, EngineError> {
        self.store
            .read()
            .await
            .get(id)
            .ok_or_else(|| EngineError::NotFound(format!("Emissions record {}", id)))
    }
}
