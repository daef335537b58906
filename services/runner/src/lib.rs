mod cli;
mod demo;
mod digest;
mod infra;

use job_digest::error::AppError;

pub fn run() -> Result<(), AppError> {
    cli::run()
}
