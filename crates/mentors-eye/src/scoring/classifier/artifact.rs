use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::forest::RandomForest;
use super::{Classifier, LabelCodec};
use crate::scoring::features::FeatureManifest;

pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Min-max scaling fitted on the training set, one entry per manifest column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    data_min: Vec<f64>,
    data_max: Vec<f64>,
}

impl MinMaxScaler {
    pub fn new(data_min: Vec<f64>, data_max: Vec<f64>) -> Self {
        Self { data_min, data_max }
    }

    pub fn len(&self) -> usize {
        self.data_min.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data_min.is_empty()
    }

    /// Constant training columns have a zero range and are only shifted.
    pub fn transform(&self, values: &[f64]) -> Vec<f64> {
        values
            .iter()
            .zip(self.data_min.iter().zip(&self.data_max))
            .map(|(value, (min, max))| {
                let range = max - min;
                let range = if range == 0.0 { 1.0 } else { range };
                (value - min) / range
            })
            .collect()
    }

    fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.data_min.len() != self.data_max.len() {
            problems.push(format!(
                "scaler has {} minimums but {} maximums",
                self.data_min.len(),
                self.data_max.len()
            ));
        }
        let finite = self
            .data_min
            .iter()
            .chain(&self.data_max)
            .all(|value| value.is_finite());
        if !finite {
            problems.push("scaler bounds must be finite".to_string());
        }
        problems
    }
}

/// Versioned bundle written by the training job: classifier, scaling
/// parameters, categorical encodings, column manifest and label codec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub model_version: String,
    pub labels: LabelCodec,
    pub manifest: FeatureManifest,
    #[serde(default)]
    pub scaler: Option<MinMaxScaler>,
    pub forest: RandomForest,
}

impl ModelArtifact {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ArtifactError> {
        let artifact: ModelArtifact = serde_json::from_reader(reader)?;
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn from_json(json: &str) -> Result<Self, ArtifactError> {
        let artifact: ModelArtifact = serde_json::from_str(json)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Rejects bundles whose parts disagree with each other. A stale manifest
    /// must fail here rather than feed misaligned columns to the forest.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ArtifactError::UnsupportedVersion {
                found: self.format_version,
                expected: ARTIFACT_FORMAT_VERSION,
            });
        }

        let mut problems = self.manifest.problems();
        problems.extend(self.labels.problems());

        if self.forest.n_features() != self.manifest.len() {
            problems.push(format!(
                "manifest lists {} columns but the forest was trained on {}",
                self.manifest.len(),
                self.forest.n_features()
            ));
        }
        if self.forest.n_classes() != self.labels.len() {
            problems.push(format!(
                "label codec has {} labels but the forest predicts {} classes",
                self.labels.len(),
                self.forest.n_classes()
            ));
        }
        if let Some(scaler) = &self.scaler {
            problems.extend(scaler.problems());
            if scaler.len() != self.manifest.len() {
                problems.push(format!(
                    "scaler covers {} columns, manifest lists {}",
                    scaler.len(),
                    self.manifest.len()
                ));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ArtifactError::Incompatible(problems.join("; ")))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("failed to read model artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("model artifact is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("model artifact format version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("model artifact is incompatible: {0}")]
    Incompatible(String),
}
