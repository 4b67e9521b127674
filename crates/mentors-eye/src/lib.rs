pub mod config;
pub mod error;
pub mod scoring;
pub mod students;
pub mod telemetry;
