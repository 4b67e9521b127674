use std::sync::Arc;

use crate::scoring::record::fields;
use crate::scoring::{
    Classifier, ClassifierAdapter, FeatureManifest, LabelCodec, RiskEngine, RuleConfig,
    StudentRecord,
};

/// Returns the same distribution for every vector, in Dropout/Enrolled/Graduate
/// order.
pub(super) struct StubClassifier {
    pub(super) probabilities: Vec<f64>,
}

impl Classifier for StubClassifier {
    fn n_features(&self) -> usize {
        FeatureManifest::standard().len()
    }

    fn n_classes(&self) -> usize {
        self.probabilities.len()
    }

    fn predict_proba(&self, _features: &[f64]) -> Vec<f64> {
        self.probabilities.clone()
    }
}

pub(super) fn adapter(probabilities: [f64; 3]) -> ClassifierAdapter {
    ClassifierAdapter::new(
        Arc::new(StubClassifier {
            probabilities: probabilities.to_vec(),
        }),
        LabelCodec::standard(),
        FeatureManifest::standard(),
    )
    .expect("stub adapter matches the standard manifest")
}

pub(super) fn engine(probabilities: [f64; 3]) -> RiskEngine {
    RiskEngine::new(adapter(probabilities), RuleConfig::default())
}

pub(super) fn graduating_engine() -> RiskEngine {
    engine([0.1, 0.2, 0.7])
}

pub(super) fn dropout_engine() -> RiskEngine {
    engine([0.7, 0.2, 0.1])
}

/// Clears every rule threshold.
pub(super) fn passing_record() -> StudentRecord {
    StudentRecord::new()
        .with(fields::ATTENDANCE, 92)
        .with(fields::AVERAGE_SCORE, 78)
        .with(fields::MIDTERM_GRADE, 74)
        .with(fields::FEE_STATUS, "Paid")
        .with(fields::LMS_LOGINS, 6)
        .with(fields::SCHOLARSHIP_HOLDER, false)
}

/// Trips all four academic and financial rules.
pub(super) fn struggling_record() -> StudentRecord {
    StudentRecord::new()
        .with(fields::ATTENDANCE, 60)
        .with(fields::AVERAGE_SCORE, 55)
        .with(fields::MIDTERM_GRADE, 70)
        .with(fields::FEE_STATUS, "Overdue")
        .with(fields::LMS_LOGINS, 2)
}

pub(super) fn factor_texts(factors: &[crate::scoring::RiskFactor]) -> Vec<&str> {
    factors.iter().map(|factor| factor.text.as_str()).collect()
}
