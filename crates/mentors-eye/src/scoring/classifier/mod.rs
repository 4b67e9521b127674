mod artifact;
mod forest;

pub use artifact::{ArtifactError, MinMaxScaler, ModelArtifact, ARTIFACT_FORMAT_VERSION};
pub use forest::{DecisionTree, RandomForest, TreeNode};

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::ScoringError;
use super::features::{FeatureManifest, FeatureVector};

/// Trained probabilistic model. Implementations are shared across scoring
/// calls and must not mutate on predict.
pub trait Classifier: Send + Sync {
    fn n_features(&self) -> usize;
    fn n_classes(&self) -> usize;
    /// `features` always holds exactly `n_features` values.
    fn predict_proba(&self, features: &[f64]) -> Vec<f64>;
}

/// Maps class indices to the human-readable outcome labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelCodec {
    labels: Vec<String>,
}

impl LabelCodec {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Dropout, Enrolled, Graduate in encoder order.
    pub fn standard() -> Self {
        Self::new(["Dropout", "Enrolled", "Graduate"])
    }

    pub fn decode(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.labels.is_empty() {
            problems.push("label codec is empty".to_string());
        }
        let mut sorted = self.labels.clone();
        sorted.sort();
        sorted.dedup();
        if sorted.len() != self.labels.len() {
            problems.push("label codec contains duplicate labels".to_string());
        }
        problems
    }
}

/// Classifier output: the arg-max label and the per-label probabilities
/// rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    predicted_label: String,
    probabilities: BTreeMap<String, f64>,
}

impl Classification {
    pub fn new(predicted_label: impl Into<String>, probabilities: BTreeMap<String, f64>) -> Self {
        Self {
            predicted_label: predicted_label.into(),
            probabilities,
        }
    }

    pub fn predicted_label(&self) -> &str {
        &self.predicted_label
    }

    pub fn probabilities(&self) -> &BTreeMap<String, f64> {
        &self.probabilities
    }

    pub fn percentages(&self) -> BTreeMap<String, u8> {
        self.probabilities
            .iter()
            .map(|(label, probability)| (label.clone(), (probability * 100.0).round() as u8))
            .collect()
    }
}

fn round_probability(probability: f64) -> f64 {
    (probability.clamp(0.0, 1.0) * 100.0).round() / 100.0
}

/// Loaded model bundle ready for concurrent read-only use.
pub struct ClassifierAdapter {
    classifier: Arc<dyn Classifier>,
    codec: LabelCodec,
    manifest: FeatureManifest,
    scaler: Option<MinMaxScaler>,
    model_version: String,
}

impl std::fmt::Debug for ClassifierAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierAdapter")
            .field("labels", &self.codec.labels)
            .field("columns", &self.manifest.len())
            .field("scaled", &self.scaler.is_some())
            .field("model_version", &self.model_version)
            .finish()
    }
}

impl ClassifierAdapter {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        codec: LabelCodec,
        manifest: FeatureManifest,
    ) -> Result<Self, ArtifactError> {
        let mut problems = manifest.problems();
        problems.extend(codec.problems());
        if classifier.n_features() != manifest.len() {
            problems.push(format!(
                "manifest lists {} columns but the classifier expects {}",
                manifest.len(),
                classifier.n_features()
            ));
        }
        if classifier.n_classes() != codec.len() {
            problems.push(format!(
                "label codec has {} labels but the classifier predicts {} classes",
                codec.len(),
                classifier.n_classes()
            ));
        }
        if !problems.is_empty() {
            return Err(ArtifactError::Incompatible(problems.join("; ")));
        }

        Ok(Self {
            classifier,
            codec,
            manifest,
            scaler: None,
            model_version: "unversioned".to_string(),
        })
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, ArtifactError> {
        artifact.validate()?;
        let ModelArtifact {
            model_version,
            labels,
            manifest,
            scaler,
            forest,
            ..
        } = artifact;

        let mut adapter = Self::new(Arc::new(forest), labels, manifest)?;
        adapter.scaler = scaler;
        adapter.model_version = model_version;
        Ok(adapter)
    }

    pub fn with_scaler(mut self, scaler: MinMaxScaler) -> Result<Self, ArtifactError> {
        if scaler.len() != self.manifest.len() {
            return Err(ArtifactError::Incompatible(format!(
                "scaler covers {} columns, manifest lists {}",
                scaler.len(),
                self.manifest.len()
            )));
        }
        self.scaler = Some(scaler);
        Ok(self)
    }

    pub fn with_model_version(mut self, version: impl Into<String>) -> Self {
        self.model_version = version.into();
        self
    }

    pub fn manifest(&self) -> &FeatureManifest {
        &self.manifest
    }

    pub fn labels(&self) -> &LabelCodec {
        &self.codec
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    pub fn classify(&self, vector: &FeatureVector) -> Result<Classification, ScoringError> {
        if vector.len() != self.manifest.len() {
            return Err(ScoringError::ManifestMismatch {
                expected: self.manifest.len(),
                actual: vector.len(),
            });
        }

        let scaled = match &self.scaler {
            Some(scaler) => scaler.transform(vector.as_slice()),
            None => vector.as_slice().to_vec(),
        };

        let probabilities = self.classifier.predict_proba(&scaled);
        if probabilities.len() != self.codec.len() {
            return Err(ScoringError::ModelUnavailable {
                reason: format!(
                    "classifier returned {} probabilities for {} labels",
                    probabilities.len(),
                    self.codec.len()
                ),
            });
        }

        let mut best = 0;
        for (index, probability) in probabilities.iter().enumerate() {
            if *probability > probabilities[best] {
                best = index;
            }
        }

        let predicted_label = self.codec.decode(best).unwrap_or_default().to_string();
        let probabilities = self
            .codec
            .labels()
            .iter()
            .zip(&probabilities)
            .map(|(label, probability)| (label.clone(), round_probability(*probability)))
            .collect();

        Ok(Classification::new(predicted_label, probabilities))
    }
}
