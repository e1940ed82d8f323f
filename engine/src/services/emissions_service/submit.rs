// Handler for a single emissions submission
use shared::models::{EmissionsSubmission, SubmissionResult};

use super::helpers::build_record;
use crate::data::store::SharedStore;
use crate::error::EngineError;

pub async fn handle_submit(
    submission: EmissionsSubmission,
    store: SharedStore,
    default_unit: &str,
) -> SubmissionResult {
    let record = match build_record(&submission, default_unit) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(
                organization_id = %submission.organization_id,
                scope = %submission.scope,
                error = %e,
                "Rejected emissions submission"
            );
            return EngineError::from(e).into();
        }
    };

    let record_id = record.id;
    let organization_id = record.organization_id.clone();
    let mut guard = store.write().await;
    match guard.insert(record) {
        Ok(()) => {
            tracing::info!(%record_id, %organization_id, "Stored emissions record");
            SubmissionResult::stored(record_id)
        }
        Err(e) => {
            tracing::error!(%organization_id, error = %e, "Failed to store emissions record");
            e.into()
        }
    }
}
