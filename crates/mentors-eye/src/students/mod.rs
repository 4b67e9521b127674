//! Student roster: snapshot storage, CSV imports, and the risk assessment
//! service and HTTP routes built on the scoring engine.

pub mod domain;
pub mod importer;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{StudentId, StudentSnapshot};
pub use importer::{StudentCsvImporter, StudentImportError};
pub use repository::{RepositoryError, StudentRepository};
pub use router::risk_router;
pub use service::{
    RejectedSnapshot, RiskAssessmentService, RiskServiceError, RosterReport, StudentRiskDetail,
    StudentRiskSummary,
};
