use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::domain::{StudentId, StudentSnapshot};
use super::repository::{RepositoryError, StudentRepository};
use crate::scoring::{RiskEngine, RiskVerdict, ScoringError, ScoringMode, StudentRecord};

/// Latest verdict for one student, as listed on the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct StudentRiskSummary {
    pub student_id: StudentId,
    pub reporting_period: u32,
    pub risk: RiskVerdict,
}

/// Stored snapshot that could not be scored because its fields are unusable.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedSnapshot {
    pub student_id: StudentId,
    pub reporting_period: u32,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RosterReport {
    pub students: Vec<StudentRiskSummary>,
    pub rejected: Vec<RejectedSnapshot>,
}

/// Current verdict plus the full period history for one student.
#[derive(Debug, Clone, Serialize)]
pub struct StudentRiskDetail {
    pub student_id: StudentId,
    pub reporting_period: u32,
    pub current: StudentRecord,
    pub risk: RiskVerdict,
    pub history: Vec<StudentSnapshot>,
}

/// Service composing the snapshot repository with the risk engine.
pub struct RiskAssessmentService<R> {
    engine: Arc<RiskEngine>,
    repository: Arc<R>,
}

impl<R> RiskAssessmentService<R>
where
    R: StudentRepository + 'static,
{
    pub fn new(engine: Arc<RiskEngine>, repository: Arc<R>) -> Self {
        Self { engine, repository }
    }

    pub fn engine(&self) -> &RiskEngine {
        &self.engine
    }

    /// Score an ad-hoc record such as an edited form; nothing is stored.
    pub fn recalculate(
        &self,
        record: &StudentRecord,
        mode: ScoringMode,
    ) -> Result<RiskVerdict, RiskServiceError> {
        Ok(self.engine.score_with(record, mode)?)
    }

    /// Scores every student's latest snapshot, highest risk first. Snapshots
    /// with unusable fields are listed separately; model failures abort the
    /// whole roster.
    pub fn roster(&self, mode: ScoringMode) -> Result<RosterReport, RiskServiceError> {
        let mut students = Vec::new();
        let mut rejected = Vec::new();

        for snapshot in self.repository.latest()? {
            match self.engine.score_with(&snapshot.record, mode) {
                Ok(risk) => students.push(StudentRiskSummary {
                    student_id: snapshot.student_id,
                    reporting_period: snapshot.reporting_period,
                    risk,
                }),
                Err(ScoringError::Schema(err)) => {
                    warn!(student_id = %snapshot.student_id, error = %err, "skipping unscorable snapshot");
                    rejected.push(RejectedSnapshot {
                        student_id: snapshot.student_id,
                        reporting_period: snapshot.reporting_period,
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err.into()),
            }
        }

        students.sort_by(|left, right| right.risk.score().cmp(&left.risk.score()));
        Ok(RosterReport { students, rejected })
    }

    pub fn student_detail(
        &self,
        student_id: &StudentId,
        mode: ScoringMode,
    ) -> Result<StudentRiskDetail, RiskServiceError> {
        let history = self.repository.history(student_id)?;
        let current = history.last().cloned().ok_or(RepositoryError::NotFound)?;
        let risk = self.engine.score_with(&current.record, mode)?;

        Ok(StudentRiskDetail {
            student_id: current.student_id,
            reporting_period: current.reporting_period,
            current: current.record,
            risk,
            history,
        })
    }

    pub fn import(&self, snapshots: Vec<StudentSnapshot>) -> Result<usize, RiskServiceError> {
        let count = snapshots.len();
        for snapshot in snapshots {
            self.repository.insert(snapshot)?;
        }
        info!(count, "imported student snapshots");
        Ok(count)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RiskServiceError {
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
