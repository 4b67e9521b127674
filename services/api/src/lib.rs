mod cli;
mod infra;
mod report;
mod routes;
mod server;

use mentors_eye::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
