use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::SchemaError;

/// Raw column names shared by the normalizer, the rule table and CSV imports.
pub mod fields {
    pub const ATTENDANCE: &str = "AttendancePercentage";
    pub const AVERAGE_SCORE: &str = "AverageScore";
    pub const MIDTERM_GRADE: &str = "MidtermGrade";
    pub const FEE_STATUS: &str = "FeeStatus";
    pub const LMS_LOGINS: &str = "LMS_Logins_Per_Week";
    pub const SCHOLARSHIP_HOLDER: &str = "ScholarshipHolder";
    pub const FINANCIAL_STRESS: &str = "FinancialStressScore";
    pub const HEALTH_IMPACT: &str = "HealthImpact";
    pub const CAREER_CONFIDENCE: &str = "CareerConfidenceScore";

    pub const GRADE_VELOCITY: &str = "Grade_Velocity";
    pub const ENGAGEMENT_SCORE: &str = "Engagement_Score";
}

/// Single raw value as it arrives from storage, CSV exports or form posts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(value) => write!(f, "{value}"),
            FieldValue::Number(value) => write!(f, "{value}"),
            FieldValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Field mapping for one student at one reporting period.
///
/// JSON `null` values are treated as absent so that form submissions with blank
/// inputs fall back to the same neutral defaults as missing columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Option<FieldValue>>",
    into = "BTreeMap<String, FieldValue>"
)]
pub struct StudentRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl From<BTreeMap<String, Option<FieldValue>>> for StudentRecord {
    fn from(raw: BTreeMap<String, Option<FieldValue>>) -> Self {
        let fields = raw
            .into_iter()
            .filter_map(|(name, value)| value.map(|value| (name, value)))
            .collect();
        Self { fields }
    }
}

impl From<StudentRecord> for BTreeMap<String, FieldValue> {
    fn from(record: StudentRecord) -> Self {
        record.fields
    }
}

impl FromIterator<(String, FieldValue)> for StudentRecord {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl StudentRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<FieldValue>) {
        self.fields.insert(name.to_string(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Numeric view of a field. Booleans read as 0/1 and numeric strings are
    /// parsed; blank strings count as absent.
    pub fn number(&self, name: &str) -> Result<Option<f64>, SchemaError> {
        match self.fields.get(name) {
            None => Ok(None),
            Some(value) => numeric_value(name, value),
        }
    }

    /// Required 0-100 metric such as attendance or the running average.
    pub fn percentage(&self, name: &str) -> Result<f64, SchemaError> {
        let value = self
            .number(name)?
            .ok_or_else(|| SchemaError::missing(name))?;

        if !(0.0..=100.0).contains(&value) {
            return Err(SchemaError::malformed(
                name,
                format!("{value} is outside 0-100"),
            ));
        }

        Ok(value)
    }

    /// Lenient yes/no reading used by rules; anything unrecognised is `None`.
    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.fields.get(name)? {
            FieldValue::Bool(value) => Some(*value),
            FieldValue::Number(value) => Some(*value != 0.0),
            FieldValue::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "yes" | "y" | "true" | "1" => Some(true),
                "no" | "n" | "false" | "0" => Some(false),
                _ => None,
            },
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.fields.get(name)? {
            FieldValue::Text(text) => Some(text.trim()),
            _ => None,
        }
    }

    pub fn fee_status(&self) -> Result<FeeStatus, SchemaError> {
        match self.fields.get(fields::FEE_STATUS) {
            None => Err(SchemaError::missing(fields::FEE_STATUS)),
            Some(FieldValue::Text(text)) if text.trim().is_empty() => {
                Err(SchemaError::missing(fields::FEE_STATUS))
            }
            Some(FieldValue::Text(text)) => Ok(FeeStatus::parse(text)),
            Some(other) => Err(SchemaError::malformed(
                fields::FEE_STATUS,
                format!("expected a status label, found {other}"),
            )),
        }
    }
}

fn numeric_value(name: &str, value: &FieldValue) -> Result<Option<f64>, SchemaError> {
    let number = match value {
        FieldValue::Number(number) => *number,
        FieldValue::Bool(flag) => {
            if *flag {
                1.0
            } else {
                0.0
            }
        }
        FieldValue::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<f64>()
                .map_err(|_| SchemaError::malformed(name, format!("'{trimmed}' is not numeric")))?
        }
    };

    if number.is_finite() {
        Ok(Some(number))
    } else {
        Err(SchemaError::malformed(name, "value is not finite"))
    }
}

/// Tuition fee standing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeStatus {
    Paid,
    Overdue,
    Other,
}

impl FeeStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "paid" => Self::Paid,
            "overdue" => Self::Overdue,
            _ => Self::Other,
        }
    }
}
