use std::io::Read;
use std::path::Path;

use super::domain::{StudentId, StudentSnapshot};
use crate::scoring::{FieldValue, StudentRecord};

pub const STUDENT_ID_COLUMN: &str = "StudentID";
pub const REPORTING_PERIOD_COLUMN: &str = "ReportingPeriod";

#[derive(Debug)]
pub enum StudentImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    MissingColumn(&'static str),
    InvalidRow { line: u64, reason: String },
}

impl std::fmt::Display for StudentImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StudentImportError::Io(err) => write!(f, "failed to read student export: {}", err),
            StudentImportError::Csv(err) => write!(f, "invalid student CSV data: {}", err),
            StudentImportError::MissingColumn(column) => {
                write!(f, "student export has no '{}' column", column)
            }
            StudentImportError::InvalidRow { line, reason } => {
                write!(f, "student export line {}: {}", line, reason)
            }
        }
    }
}

impl std::error::Error for StudentImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StudentImportError::Io(err) => Some(err),
            StudentImportError::Csv(err) => Some(err),
            StudentImportError::MissingColumn(_) | StudentImportError::InvalidRow { .. } => None,
        }
    }
}

impl From<std::io::Error> for StudentImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for StudentImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Reads historical student exports (one row per student and reporting
/// period) into snapshots. Exports without a `ReportingPeriod` column are
/// treated as a single period.
pub struct StudentCsvImporter;

impl StudentCsvImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<StudentSnapshot>, StudentImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<StudentSnapshot>, StudentImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = csv_reader.headers()?.clone();

        let id_index = headers
            .iter()
            .position(|header| header == STUDENT_ID_COLUMN)
            .ok_or(StudentImportError::MissingColumn(STUDENT_ID_COLUMN))?;
        let period_index = headers
            .iter()
            .position(|header| header == REPORTING_PERIOD_COLUMN);

        let mut snapshots = Vec::new();
        for row in csv_reader.records() {
            let row = row?;
            let line = row.position().map(|position| position.line()).unwrap_or(0);

            let student_id = row.get(id_index).unwrap_or_default();
            if student_id.is_empty() {
                return Err(StudentImportError::InvalidRow {
                    line,
                    reason: "missing StudentID".to_string(),
                });
            }

            let reporting_period = match period_index.and_then(|index| row.get(index)) {
                None | Some("") => 1,
                Some(raw) => parse_period(raw).ok_or_else(|| StudentImportError::InvalidRow {
                    line,
                    reason: format!("'{raw}' is not a reporting period"),
                })?,
            };

            let record: StudentRecord = headers
                .iter()
                .zip(row.iter())
                .enumerate()
                .filter(|(index, _)| *index != id_index && Some(*index) != period_index)
                .filter_map(|(_, (header, cell))| {
                    parse_cell(cell).map(|value| (header.to_string(), value))
                })
                .collect();

            snapshots.push(StudentSnapshot {
                student_id: StudentId(student_id.to_string()),
                reporting_period,
                record,
            });
        }

        Ok(snapshots)
    }
}

/// SQLite dumps write integer columns as `3.0` at times.
fn parse_period(raw: &str) -> Option<u32> {
    raw.parse::<u32>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|value| value.fract() == 0.0 && *value >= 0.0 && *value <= f64::from(u32::MAX))
            .map(|value| value as u32)
    })
}

fn parse_cell(cell: &str) -> Option<FieldValue> {
    if cell.is_empty() {
        return None;
    }

    if cell.eq_ignore_ascii_case("true") {
        return Some(FieldValue::Bool(true));
    }
    if cell.eq_ignore_ascii_case("false") {
        return Some(FieldValue::Bool(false));
    }

    match cell.parse::<f64>() {
        Ok(number) if number.is_finite() => Some(FieldValue::Number(number)),
        _ => Some(FieldValue::Text(cell.to_string())),
    }
}
