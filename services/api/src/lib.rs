mod cli;
mod demo;
mod infra;
mod routes;
mod server;

use audelas::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
