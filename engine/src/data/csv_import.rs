use csv::{ReaderBuilder, StringRecord};
use serde_json::{Number, Value};
use shared::models::{EmissionsScope, EmissionsSubmission};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::EngineError;

// Header: organization_id,scope,value,unit,period_start,period_end
// Example row: acme,scope1,1234.5,tCO2e,2024-01-01,2024-01-31
const REQUIRED_COLUMNS: [&str; 5] = ["organization_id", "scope", "value", "period_start", "period_end"];
const UNIT_COLUMN: &str = "unit";

/// A row that was read successfully; its value is still unchecked.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRow {
    pub line: u64,
    pub submission: EmissionsSubmission,
}

/// A row that could not be turned into a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRejection {
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ParsedCsv {
    pub rows: Vec<CsvRow>,
    pub rejections: Vec<RowRejection>,
}

struct ColumnIndex {
    organization_id: usize,
    scope: usize,
    value: usize,
    period_start: usize,
    period_end: usize,
    unit: Option<usize>,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Result<Self, EngineError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|header| header.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| EngineError::CsvDataFormatError(format!("Missing '{}' column", name)))
        };
        Ok(Self {
            organization_id: require(REQUIRED_COLUMNS[0])?,
            scope: require(REQUIRED_COLUMNS[1])?,
            value: require(REQUIRED_COLUMNS[2])?,
            period_start: require(REQUIRED_COLUMNS[3])?,
            period_end: require(REQUIRED_COLUMNS[4])?,
            unit: find(UNIT_COLUMN),
        })
    }
}

pub struct EmissionsCsvReader {
    delimiter: u8,
}

impl EmissionsCsvReader {
    pub fn new(delimiter: char) -> Result<Self, EngineError> {
        if !delimiter.is_ascii() {
            return Err(EngineError::ConfigError(format!(
                "CSV delimiter must be ASCII, got '{}'",
                delimiter
            )));
        }
        Ok(Self {
            delimiter: delimiter as u8,
        })
    }

    pub fn read_path(&self, path: &Path) -> Result<ParsedCsv, EngineError> {
        let file = File::open(path).map_err(|e| {
            EngineError::CsvDataFormatError(format!("Failed to open CSV file '{}': {}", path.display(), e))
        })?;
        self.read(BufReader::new(file))
    }

    /// Missing required columns fail the whole input; problems in individual
    /// rows are collected as rejections with their line number.
    pub fn read<R: Read>(&self, reader: R) -> Result<ParsedCsv, EngineError> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let columns = ColumnIndex::from_headers(&headers)?;
        let mut parsed = ParsedCsv::default();

        for (idx, result) in rdr.records().enumerate() {
            let fallback_line = idx as u64 + 2;
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    let line = e.position().map_or(fallback_line, |p| p.line());
                    parsed.rejections.push(RowRejection {
                        line,
                        reason: format!("Malformed CSV record: {}", e),
                    });
                    continue;
                }
            };
            let line = record.position().map_or(fallback_line, |p| p.line());

            match Self::to_submission(&record, &columns) {
                Ok(submission) => parsed.rows.push(CsvRow { line, submission }),
                Err(reason) => parsed.rejections.push(RowRejection { line, reason }),
            }
        }
        Ok(parsed)
    }

    fn to_submission(record: &StringRecord, columns: &ColumnIndex) -> Result<EmissionsSubmission, String> {
        let field = |pos: usize, name: &str| {
            record
                .get(pos)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| format!("Missing '{}' field", name))
        };

        let organization_id = field(columns.organization_id, "organization_id")?;
        let scope = field(columns.scope, "scope")?
            .parse::<EmissionsScope>()
            .map_err(|e| e.to_string())?;
        let unit = columns
            .unit
            .and_then(|pos| record.get(pos))
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        Ok(EmissionsSubmission {
            organization_id: organization_id.to_string(),
            scope,
            value: cell_to_value(record.get(columns.value).unwrap_or("")),
            unit,
            period_start: field(columns.period_start, "period_start")?.to_string(),
            period_end: field(columns.period_end, "period_end")?.to_string(),
        })
    }
}

// Numeric cells become JSON numbers; anything else is passed through as text
// (or null when empty) so the emissions validator decides on it.
fn cell_to_value(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    cell.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(cell.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn read(content: &str) -> Result<ParsedCsv, EngineError> {
        EmissionsCsvReader::new(',').unwrap().read(content.as_bytes())
    }

    #[test]
    fn test_read_valid_rows() {
        let parsed = read(
            "organization_id,scope,value,unit,period_start,period_end
acme,scope1,1234.5,tCO2e,2024-01-01,2024-01-31
acme,Scope 2,0,,2024-02-01,2024-02-29",
        )
        .unwrap();

        assert!(parsed.rejections.is_empty());
        assert_eq!(parsed.rows.len(), 2);
        let first = &parsed.rows[0];
        assert_eq!(first.line, 2);
        assert_eq!(first.submission.organization_id, "acme");
        assert_eq!(first.submission.scope, EmissionsScope::Scope1);
        assert_eq!(first.submission.value, json!(1234.5));
        assert_eq!(first.submission.unit.as_deref(), Some("tCO2e"));

        let second = &parsed.rows[1];
        assert_eq!(second.line, 3);
        assert_eq!(second.submission.scope, EmissionsScope::Scope2);
        assert!(second.submission.unit.is_none());
    }

    #[test]
    fn test_columns_are_found_by_name() {
        let parsed = read(
            "Period_End , Value,Scope,Organization_ID,Period_Start
2024-03-31,7,3,globex,2024-03-01",
        )
        .unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].submission.organization_id, "globex");
        assert_eq!(parsed.rows[0].submission.period_end, "2024-03-31");
        assert_eq!(parsed.rows[0].submission.value, json!(7.0));
    }

    #[test]
    fn test_missing_required_column_fails_file() {
        let result = read("organization_id,scope,value,period_start\nacme,scope1,1,2024-01-01");
        let err = result.unwrap_err();
        assert!(matches!(err, EngineError::CsvDataFormatError(_)));
        assert!(err.to_string().contains("Missing 'period_end' column"));
    }

    #[test]
    fn test_non_numeric_values_pass_through_unchecked() {
        let parsed = read(
            "organization_id,scope,value,period_start,period_end
acme,scope1,lots,2024-01-01,2024-01-31
acme,scope1,,2024-01-01,2024-01-31
acme,scope1,NaN,2024-01-01,2024-01-31",
        )
        .unwrap();
        assert_eq!(parsed.rows[0].submission.value, json!("lots"));
        assert_eq!(parsed.rows[1].submission.value, Value::Null);
        assert_eq!(parsed.rows[2].submission.value, json!("NaN"));
    }

    #[test]
    fn test_bad_rows_become_rejections_with_line_numbers() {
        let parsed = read(
            "organization_id,scope,value,period_start,period_end
acme,scope9,1,2024-01-01,2024-01-31
,scope1,1,2024-01-01,2024-01-31
acme,scope1,1,2024-01-01
acme,scope1,1,2024-01-01,2024-01-31",
        )
        .unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].line, 5);
        let lines: Vec<u64> = parsed.rejections.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![2, 3, 4]);
        assert!(parsed.rejections[0].reason.contains("Unknown emissions scope"));
        assert!(parsed.rejections[1].reason.contains("Missing 'organization_id' field"));
        assert!(parsed.rejections[2].reason.contains("Malformed CSV record"));
    }

    #[test]
    fn test_semicolon_delimiter_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "organization_id;scope;value;period_start;period_end\nacme;scope1;12.5;2024-01-01;2024-01-31"
        )
        .unwrap();
        let parsed = EmissionsCsvReader::new(';').unwrap().read_path(file.path()).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].submission.value, json!(12.5));
    }

    #[test]
    fn test_missing_file() {
        let result = EmissionsCsvReader::new(',')
            .unwrap()
            .read_path(Path::new("/no/such/emissions.csv"));
        assert!(matches!(result, Err(EngineError::CsvDataFormatError(_))));
    }
}
