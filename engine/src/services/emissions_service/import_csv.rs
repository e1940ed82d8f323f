// Handler for bulk import of emissions readings from CSV
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

use super::helpers::build_record;
use crate::data::csv_import::{EmissionsCsvReader, RowRejection};
use crate::data::store::SharedStore;
use crate::error::EngineError;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub record_ids: Vec<Uuid>,
    pub rejections: Vec<RejectedRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    pub line: u64,
    pub reason: String,
}

impl From<RowRejection> for RejectedRow {
    fn from(r: RowRejection) -> Self {
        Self {
            line: r.line,
            reason: r.reason,
        }
    }
}

impl ImportSummary {
    pub fn imported(&self) -> usize {
        self.record_ids.len()
    }
}

/// Rows failing validation are reported and skipped. The valid rows go to the
/// store as one batch; a storage failure stops the import with that error.
pub async fn handle_import_csv(
    path: &Path,
    reader: &EmissionsCsvReader,
    store: SharedStore,
    default_unit: &str,
) -> Result<ImportSummary, EngineError> {
    let parsed = reader.read_path(path)?;
    tracing::debug!(
        path = %path.display(),
        rows = parsed.rows.len(),
        unreadable = parsed.rejections.len(),
        "Read emissions CSV"
    );

    let mut rejections: Vec<RejectedRow> = parsed.rejections.into_iter().map(RejectedRow::from).collect();
    let mut records = Vec::with_capacity(parsed.rows.len());
    for row in parsed.rows {
        match build_record(&row.submission, default_unit) {
            Ok(record) => records.push(record),
            Err(e) => rejections.push(RejectedRow {
                line: row.line,
                reason: e.to_string(),
            }),
        }
    }

    let record_ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
    if !records.is_empty() {
        let mut guard = store.write().await;
        guard.insert_many(records).map_err(|e| {
            tracing::error!(
                path = %path.display(),
                records = record_ids.len(),
                error = %e,
                "Import aborted by storage failure"
            );
            e
        })?;
    }

    let mut summary = ImportSummary { record_ids, rejections };
    summary.rejections.sort_by_key(|r| r.line);
    tracing::info!(
        path = %path.display(),
        imported = summary.imported(),
        rejected = summary.rejections.len(),
        "Imported emissions CSV"
    );
    Ok(summary)
}
