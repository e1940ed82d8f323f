// Turns an unchecked submission into a record ready for storage.
use chrono::Utc;
use shared::models::{EmissionsRecord, EmissionsSubmission};
use shared::{parse_date_range, EmissionsValue, ValidationError};
use uuid::Uuid;

pub fn build_record(submission: &EmissionsSubmission, default_unit: &str) -> Result<EmissionsRecord, ValidationError> {
    let organization_id = submission.organization_id.trim();
    if organization_id.is_empty() {
        return Err(ValidationError::InvalidArgument(
            "organization_id must not be empty".to_string(),
        ));
    }

    let value = EmissionsValue::try_from(&submission.value)?;
    let period = parse_date_range(&submission.period_start, &submission.period_end)?;
    let unit = submission
        .unit
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or(default_unit);

    Ok(EmissionsRecord {
        id: Uuid::new_v4(),
        organization_id: organization_id.to_string(),
        scope: submission.scope,
        value: value.get(),
        unit: unit.to_string(),
        period,
        recorded_at: Utc::now(),
    })
}
