// Handler for per-organization emissions totals
use serde::Serialize;
use shared::models::{DateRange, EmissionsScope};
use shared::{format_with, NumberFormat};
use std::collections::BTreeMap;

use crate::data::store::SharedStore;
use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeTotal {
    pub scope: EmissionsScope,
    pub unit: String,
    pub records: usize,
    pub total: f64,
    pub formatted: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitTotal {
    pub unit: String,
    pub total: f64,
    pub formatted: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmissionsSummary {
    pub organization_id: String,
    pub period: Option<DateRange>,
    pub by_scope: Vec<ScopeTotal>,
    /// One grand total per unit; values in different units are never added.
    pub totals: Vec<UnitTotal>,
}

impl EmissionsSummary {
    pub fn is_empty(&self) -> bool {
        self.by_scope.is_empty()
    }
}

pub async fn handle_summarize(
    organization_id: &str,
    period: Option<DateRange>,
    store: SharedStore,
    number_format: &NumberFormat,
) -> Result<EmissionsSummary, EngineError> {
    let records = {
        let guard = store.read().await;
        guard.records_for_organization(organization_id, period.as_ref())
    };

    let mut by_scope: BTreeMap<(EmissionsScope, String), (usize, f64)> = BTreeMap::new();
    let mut by_unit: BTreeMap<String, f64> = BTreeMap::new();
    for record in &records {
        let entry = by_scope
            .entry((record.scope, record.unit.clone()))
            .or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += record.value;
        *by_unit.entry(record.unit.clone()).or_insert(0.0) += record.value;
    }

    let by_scope = by_scope
        .into_iter()
        .map(|((scope, unit), (records, total))| -> Result<ScopeTotal, EngineError> {
            let formatted = format_total(total, &unit, number_format)?;
            Ok(ScopeTotal {
                scope,
                unit,
                records,
                total,
                formatted,
            })
        })
        .collect::<Result<Vec<_>, EngineError>>()?;
    let totals = by_unit
        .into_iter()
        .map(|(unit, total)| -> Result<UnitTotal, EngineError> {
            let formatted = format_total(total, &unit, number_format)?;
            Ok(UnitTotal { unit, total, formatted })
        })
        .collect::<Result<Vec<_>, EngineError>>()?;

    tracing::debug!(%organization_id, records = records.len(), "Summarized emissions");
    Ok(EmissionsSummary {
        organization_id: organization_id.to_string(),
        period,
        by_scope,
        totals,
    })
}

// Every stored value is finite, but their sum can still overflow.
fn format_total(total: f64, unit: &str, number_format: &NumberFormat) -> Result<String, EngineError> {
    if !total.is_finite() {
        tracing::warn!(%unit, "Emissions total overflows f64");
        return Err(EngineError::ProcessingError(format!(
            "total for {} overflows f64",
            unit
        )));
    }
    Ok(format_with(total, number_format)?)
}
