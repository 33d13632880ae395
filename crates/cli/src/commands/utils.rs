use agora_core::api::Outcome;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Error: {0}")]
    General(String),
}

impl From<serde_json::Error> for CliError {
    fn from(error: serde_json::Error) -> Self {
        Self::General(error.to_string())
    }
}

pub type CliResult<T> = Result<T, CliError>;

pub fn print_success(message: &str) {
    println!("[SUCCESS] {message}");
}

pub fn print_error(message: &str) {
    eprintln!("[ERROR] {message}");
}

pub fn print_info(message: &str) {
    println!("[INFO] {message}");
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Unwraps a successful outcome, turning soft and hard errors into a [`CliError`].
pub fn require<T>(outcome: Outcome<T>) -> CliResult<Option<T>> {
    match outcome {
        Outcome::Success(data) => Ok(data),
        Outcome::SoftError(payload) => Err(CliError::Request(payload.message)),
        Outcome::HardError(failure) => {
            Err(CliError::Request(format!("{} ({})", failure.message, failure.kind.as_str())))
        }
    }
}
