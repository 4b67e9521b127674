/// Raw record problems that the caller must fix before scoring can proceed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("required field '{field}' is missing")]
    MissingField { field: String },
    #[error("field '{field}' is malformed: {reason}")]
    Malformed { field: String, reason: String },
}

impl SchemaError {
    pub fn missing(field: &str) -> Self {
        Self::MissingField {
            field: field.to_string(),
        }
    }

    pub fn malformed(field: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            SchemaError::MissingField { field } | SchemaError::Malformed { field, .. } => field,
        }
    }
}

/// Failure of a single scoring call. None of these are retried: scoring is
/// deterministic, so a second attempt reproduces the same error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("risk model unavailable: {reason}")]
    ModelUnavailable { reason: String },
    #[error("feature manifest mismatch: classifier expects {expected} columns, received {actual}")]
    ManifestMismatch { expected: usize, actual: usize },
}
