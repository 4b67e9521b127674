use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::error::SchemaError;
use super::record::{fields, StudentRecord};

/// Column contract fixed at training time: ordered columns, the categorical
/// vocabulary used for one-hot encoding, and neutral fallbacks for optional
/// numeric inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureManifest {
    columns: Vec<String>,
    #[serde(default)]
    encodings: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    defaults: BTreeMap<String, f64>,
}

impl FeatureManifest {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            encodings: BTreeMap::new(),
            defaults: BTreeMap::new(),
        }
    }

    /// Column order produced by the dropout model training run.
    pub fn standard() -> Self {
        Self::new([
            fields::ATTENDANCE,
            fields::AVERAGE_SCORE,
            fields::LMS_LOGINS,
            fields::MIDTERM_GRADE,
            fields::SCHOLARSHIP_HOLDER,
            fields::GRADE_VELOCITY,
            fields::ENGAGEMENT_SCORE,
            "FeeStatus_Overdue",
            "FeeStatus_Paid",
        ])
        .with_encoding(fields::FEE_STATUS, ["Overdue", "Paid"])
    }

    pub fn with_encoding<I, S>(mut self, field: &str, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.encodings.insert(
            field.to_string(),
            categories.into_iter().map(Into::into).collect(),
        );
        self
    }

    pub fn with_default(mut self, field: &str, value: f64) -> Self {
        self.defaults.insert(field.to_string(), value);
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn default_for(&self, field: &str) -> Option<f64> {
        self.defaults.get(field).copied()
    }

    /// Resolves a manifest column such as `FeeStatus_Overdue` to its source
    /// field and category.
    fn indicator(&self, column: &str) -> Option<(&str, &str)> {
        self.encodings.iter().find_map(|(field, categories)| {
            let category = column.strip_prefix(field.as_str())?.strip_prefix('_')?;
            categories
                .iter()
                .find(|known| known.as_str() == category)
                .map(|known| (field.as_str(), known.as_str()))
        })
    }

    /// Structural problems that make the manifest unusable.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.columns.is_empty() {
            problems.push("manifest has no columns".to_string());
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.as_str()) {
                problems.push(format!("column '{column}' appears more than once"));
            }
        }

        for (field, categories) in &self.encodings {
            if self.columns.iter().any(|column| column == field) {
                problems.push(format!(
                    "categorical field '{field}' cannot also be a numeric column"
                ));
            }
            if categories.is_empty() {
                problems.push(format!("categorical field '{field}' has no categories"));
            }
        }

        problems
    }
}

/// Numeric input for the classifier, ordered by the manifest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Builds the classifier input for one record.
///
/// Derived features are computed first, categorical fields are expanded into
/// the training-time indicator columns, and the result is reindexed onto the
/// manifest. A missing midterm reads as the current average; yes/no spellings
/// of flag columns read as 1/0. Other columns the record cannot supply fall
/// back to the manifest default, then zero.
///
/// Optional fields that are present but unreadable are rejected here and by
/// [`validate_record`], so strict and rules-only scoring agree on which
/// records are usable.
pub fn normalize(
    record: &StudentRecord,
    manifest: &FeatureManifest,
) -> Result<FeatureVector, SchemaError> {
    let derived = derive_features(record, manifest)?;

    let values = manifest
        .columns
        .iter()
        .map(|column| {
            if let Some(value) = derived.get(column.as_str()) {
                return Ok(*value);
            }

            if let Some((field, category)) = manifest.indicator(column) {
                let hit = record
                    .text(field)
                    .map(|value| value.eq_ignore_ascii_case(category))
                    .unwrap_or(false);
                return Ok(if hit { 1.0 } else { 0.0 });
            }

            let value = match record.number(column) {
                Ok(value) => value,
                Err(err) => match record.flag(column) {
                    Some(flag) => Some(if flag { 1.0 } else { 0.0 }),
                    None => return Err(err),
                },
            };
            Ok(value
                .or_else(|| manifest.default_for(column))
                .unwrap_or(0.0))
        })
        .collect::<Result<Vec<_>, SchemaError>>()?;

    Ok(FeatureVector::new(values))
}

/// Attendance, average score and fee status drive both the classifier and the
/// rule overlay, so they are never defaulted.
pub fn check_required(record: &StudentRecord) -> Result<(), SchemaError> {
    record.percentage(fields::ATTENDANCE)?;
    record.percentage(fields::AVERAGE_SCORE)?;
    record.fee_status()?;
    Ok(())
}

/// Required fields plus the optional inputs both scoring paths read: the
/// midterm grade must be numeric and weekly logins non-negative when given.
pub fn validate_record(record: &StudentRecord) -> Result<(), SchemaError> {
    check_required(record)?;
    record.number(fields::MIDTERM_GRADE)?;
    logins(record)?;
    Ok(())
}

fn logins(record: &StudentRecord) -> Result<Option<f64>, SchemaError> {
    match record.number(fields::LMS_LOGINS)? {
        Some(value) if value < 0.0 => Err(SchemaError::malformed(
            fields::LMS_LOGINS,
            format!("{value} logins per week is negative"),
        )),
        value => Ok(value),
    }
}

fn derive_features(
    record: &StudentRecord,
    manifest: &FeatureManifest,
) -> Result<HashMap<&'static str, f64>, SchemaError> {
    validate_record(record)?;
    let attendance = record.percentage(fields::ATTENDANCE)?;
    let average = record.percentage(fields::AVERAGE_SCORE)?;

    let midterm = record
        .number(fields::MIDTERM_GRADE)?
        .unwrap_or(average);
    let logins = logins(record)?.or_else(|| manifest.default_for(fields::LMS_LOGINS));

    let mut derived = HashMap::new();
    derived.insert(fields::ATTENDANCE, attendance);
    derived.insert(fields::AVERAGE_SCORE, average);
    derived.insert(fields::MIDTERM_GRADE, midterm);
    derived.insert(fields::GRADE_VELOCITY, velocity(average, midterm));
    if let Some(logins) = logins {
        derived.insert(fields::LMS_LOGINS, logins);
        derived.insert(fields::ENGAGEMENT_SCORE, attendance * logins);
    }

    Ok(derived)
}

fn velocity(average: f64, midterm: f64) -> f64 {
    average - midterm
}

/// Change from midterm to current average. A missing or unreadable midterm
/// carries no signal and reads as zero.
pub fn grade_velocity(record: &StudentRecord) -> f64 {
    let average = record.number(fields::AVERAGE_SCORE).ok().flatten();
    let midterm = record.number(fields::MIDTERM_GRADE).ok().flatten();

    match (average, midterm) {
        (Some(average), Some(midterm)) => velocity(average, midterm),
        _ => 0.0,
    }
}
