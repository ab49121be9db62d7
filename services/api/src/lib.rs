mod cli;
mod demo;
mod infra;
mod inspect;
mod routes;
mod server;

use kyc_onboarding::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
