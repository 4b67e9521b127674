//! Dropout-risk scoring: feature normalization, classifier inference, the
//! rule overlay and the reconciliation policy that merges them.

pub mod classifier;
mod config;
mod error;
pub mod features;
pub(crate) mod policy;
pub mod record;
pub(crate) mod rules;

#[cfg(test)]
mod tests;

pub use classifier::{
    ArtifactError, Classification, Classifier, ClassifierAdapter, LabelCodec, ModelArtifact,
};
pub use config::RuleConfig;
pub use error::{SchemaError, ScoringError};
pub use features::{normalize, FeatureManifest, FeatureVector};
pub use policy::{reconcile, RiskLevel};
pub use record::{FeeStatus, FieldValue, StudentRecord};
pub use rules::{evaluate_rules, RuleOutcome};

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// Reason for a risk verdict, weighted for display ranking only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub text: String,
    pub importance: f64,
}

impl RiskFactor {
    pub fn new(text: impl Into<String>, importance: f64) -> Self {
        Self {
            text: text.into(),
            importance,
        }
    }
}

/// Explainable verdict for one student record. Produced only by
/// [`reconcile`] and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskVerdict {
    level: RiskLevel,
    score: u8,
    probabilities: BTreeMap<String, u8>,
    factors: Vec<RiskFactor>,
}

impl RiskVerdict {
    pub fn level(&self) -> RiskLevel {
        self.level
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    /// Integer percentages keyed by outcome label; empty for rules-only
    /// verdicts.
    pub fn probabilities(&self) -> &BTreeMap<String, u8> {
        &self.probabilities
    }

    pub fn factors(&self) -> &[RiskFactor] {
        &self.factors
    }
}

/// Whether a caller accepts a rules-only verdict while the model is down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    #[default]
    Strict,
    AllowRulesOnly,
}

#[derive(Debug, Clone)]
enum ModelState {
    Loaded(Arc<ClassifierAdapter>),
    Unavailable(String),
}

/// Stateless scorer sharing one loaded model across all calls.
#[derive(Debug, Clone)]
pub struct RiskEngine {
    model: ModelState,
    rules: RuleConfig,
}

impl RiskEngine {
    pub fn new(adapter: ClassifierAdapter, rules: RuleConfig) -> Self {
        Self::with_shared(Arc::new(adapter), rules)
    }

    pub fn with_shared(adapter: Arc<ClassifierAdapter>, rules: RuleConfig) -> Self {
        Self {
            model: ModelState::Loaded(adapter),
            rules,
        }
    }

    /// Engine whose every strict scoring call fails with `ModelUnavailable`.
    pub fn unavailable(reason: impl Into<String>, rules: RuleConfig) -> Self {
        Self {
            model: ModelState::Unavailable(reason.into()),
            rules,
        }
    }

    /// Loads the artifact once at startup. A missing or incompatible bundle is
    /// logged and kept as the engine's failure state instead of aborting, so the
    /// service can still answer health checks and explicit rules-only requests.
    pub fn from_artifact_path<P: AsRef<Path>>(path: P, rules: RuleConfig) -> Self {
        let path = path.as_ref();
        match Self::try_from_artifact_path(path, rules.clone()) {
            Ok(engine) => engine,
            Err(err) => {
                error!(path = %path.display(), error = %err, "risk model failed to load");
                Self::unavailable(err.to_string(), rules)
            }
        }
    }

    pub fn try_from_artifact_path<P: AsRef<Path>>(
        path: P,
        rules: RuleConfig,
    ) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let artifact = ModelArtifact::from_path(path)?;
        let adapter = ClassifierAdapter::from_artifact(artifact)?;
        info!(
            path = %path.display(),
            model_version = adapter.model_version(),
            columns = adapter.manifest().len(),
            "risk model loaded"
        );
        Ok(Self::new(adapter, rules))
    }

    pub fn is_model_loaded(&self) -> bool {
        matches!(self.model, ModelState::Loaded(_))
    }

    pub fn model_version(&self) -> Option<&str> {
        match &self.model {
            ModelState::Loaded(adapter) => Some(adapter.model_version()),
            ModelState::Unavailable(_) => None,
        }
    }

    pub fn rules(&self) -> &RuleConfig {
        &self.rules
    }

    pub fn score(&self, record: &StudentRecord) -> Result<RiskVerdict, ScoringError> {
        self.score_with(record, ScoringMode::Strict)
    }

    pub fn score_with(
        &self,
        record: &StudentRecord,
        mode: ScoringMode,
    ) -> Result<RiskVerdict, ScoringError> {
        let adapter = match (&self.model, mode) {
            (ModelState::Loaded(adapter), _) => adapter,
            (ModelState::Unavailable(reason), ScoringMode::Strict) => {
                return Err(ScoringError::ModelUnavailable {
                    reason: reason.clone(),
                })
            }
            (ModelState::Unavailable(reason), ScoringMode::AllowRulesOnly) => {
                features::validate_record(record)?;
                warn!(%reason, "scoring with rules only; model unavailable");
                let outcome = evaluate_rules(record, &self.rules);
                return Ok(reconcile(
                    None,
                    BTreeMap::new(),
                    outcome.score,
                    outcome.factors,
                ));
            }
        };

        let vector = normalize(record, adapter.manifest())?;
        let classification = adapter.classify(&vector)?;
        let outcome = evaluate_rules(record, &self.rules);

        let verdict = reconcile(
            Some(classification.predicted_label()),
            classification.percentages(),
            outcome.score,
            outcome.factors,
        );
        debug!(
            level = verdict.level.label(),
            score = verdict.score,
            predicted = classification.predicted_label(),
            "scored student record"
        );
        Ok(verdict)
    }
}
