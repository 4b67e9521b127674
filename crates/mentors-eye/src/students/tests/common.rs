use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::scoring::record::fields;
use crate::scoring::{
    Classifier, ClassifierAdapter, FeatureManifest, LabelCodec, RiskEngine, RuleConfig,
    StudentRecord,
};
use crate::students::domain::{StudentId, StudentSnapshot};
use crate::students::repository::{RepositoryError, StudentRepository};
use crate::students::service::RiskAssessmentService;

#[derive(Default)]
pub(super) struct MemoryRepository {
    snapshots: Mutex<BTreeMap<(StudentId, u32), StudentSnapshot>>,
}

impl StudentRepository for MemoryRepository {
    fn insert(&self, snapshot: StudentSnapshot) -> Result<(), RepositoryError> {
        let mut guard = self.snapshots.lock().expect("repository mutex poisoned");
        let key = (snapshot.student_id.clone(), snapshot.reporting_period);
        if guard.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(key, snapshot);
        Ok(())
    }

    fn latest(&self) -> Result<Vec<StudentSnapshot>, RepositoryError> {
        let guard = self.snapshots.lock().expect("repository mutex poisoned");
        let mut latest: BTreeMap<StudentId, StudentSnapshot> = BTreeMap::new();
        for snapshot in guard.values() {
            latest.insert(snapshot.student_id.clone(), snapshot.clone());
        }
        Ok(latest.into_values().collect())
    }

    fn history(&self, id: &StudentId) -> Result<Vec<StudentSnapshot>, RepositoryError> {
        let guard = self.snapshots.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|snapshot| &snapshot.student_id == id)
            .cloned()
            .collect())
    }
}

pub(super) struct UnavailableRepository;

impl StudentRepository for UnavailableRepository {
    fn insert(&self, _snapshot: StudentSnapshot) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn latest(&self) -> Result<Vec<StudentSnapshot>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn history(&self, _id: &StudentId) -> Result<Vec<StudentSnapshot>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Predicts dropout whenever attendance (column 0) is below 50.
struct AttendanceClassifier;

impl Classifier for AttendanceClassifier {
    fn n_features(&self) -> usize {
        FeatureManifest::standard().len()
    }

    fn n_classes(&self) -> usize {
        3
    }

    fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        if features[0] < 50.0 {
            vec![0.8, 0.15, 0.05]
        } else {
            vec![0.1, 0.3, 0.6]
        }
    }
}

pub(super) fn engine() -> Arc<RiskEngine> {
    let adapter = ClassifierAdapter::new(
        Arc::new(AttendanceClassifier),
        LabelCodec::standard(),
        FeatureManifest::standard(),
    )
    .expect("adapter matches manifest");
    Arc::new(RiskEngine::new(adapter, RuleConfig::default()))
}

pub(super) fn record(attendance: u32, average: u32, fee: &str) -> StudentRecord {
    StudentRecord::new()
        .with(fields::ATTENDANCE, attendance)
        .with(fields::AVERAGE_SCORE, average)
        .with(fields::MIDTERM_GRADE, average)
        .with(fields::FEE_STATUS, fee)
        .with(fields::LMS_LOGINS, 4)
}

pub(super) fn snapshot(id: &str, period: u32, record: StudentRecord) -> StudentSnapshot {
    StudentSnapshot {
        student_id: StudentId(id.to_string()),
        reporting_period: period,
        record,
    }
}

/// S001 improves over time, S002 is struggling, S003 looks clean.
pub(super) fn seeded_service() -> RiskAssessmentService<MemoryRepository> {
    let service = RiskAssessmentService::new(engine(), Arc::new(MemoryRepository::default()));
    service
        .import(vec![
            snapshot("S001", 1, record(62, 55, "Overdue")),
            snapshot("S001", 2, record(81, 66, "Paid")),
            snapshot("S002", 1, record(58, 48, "Overdue")),
            snapshot("S003", 1, record(95, 88, "Paid")),
        ])
        .expect("seed import succeeds");
    service
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
