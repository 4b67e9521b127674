use super::domain::{StudentId, StudentSnapshot};

/// Storage abstraction for student snapshots so the service can be exercised
/// without a database.
pub trait StudentRepository: Send + Sync {
    fn insert(&self, snapshot: StudentSnapshot) -> Result<(), RepositoryError>;
    /// Most recent snapshot of every student, ordered by student id.
    fn latest(&self) -> Result<Vec<StudentSnapshot>, RepositoryError>;
    /// All snapshots for one student in ascending reporting period.
    fn history(&self, id: &StudentId) -> Result<Vec<StudentSnapshot>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("snapshot already exists")]
    Conflict,
    #[error("student not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
