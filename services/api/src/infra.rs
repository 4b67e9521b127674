use metrics_exporter_prometheus::PrometheusHandle;
use mentors_eye::error::AppError;
use mentors_eye::students::{
    RepositoryError, RiskAssessmentService, StudentCsvImporter, StudentId, StudentRepository,
    StudentSnapshot,
};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) model_loaded: bool,
    pub(crate) model_version: Option<String>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryStudentRepository {
    snapshots: Arc<Mutex<BTreeMap<(StudentId, u32), StudentSnapshot>>>,
}

impl StudentRepository for InMemoryStudentRepository {
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

/// Seeds the roster from a historical export before the server accepts
/// traffic.
pub(crate) fn preload_roster<R>(
    service: &RiskAssessmentService<R>,
    path: &Path,
) -> Result<usize, AppError>
where
    R: StudentRepository + 'static,
{
    let snapshots = StudentCsvImporter::from_path(path)?;
    Ok(service.import(snapshots)?)
}
