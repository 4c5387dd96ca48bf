//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("{0}")]
    Usage(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => exitcode::IOERR,
                InfraError::Application(app) => match app {
                    ApplicationError::Domain(DomainError::ReadFailed { .. }) => exitcode::IOERR,
                    ApplicationError::Domain(DomainError::MalformedNumber { .. }) => {
                        exitcode::DATAERR
                    }
                    ApplicationError::NotADirectory(_) => exitcode::NOINPUT,
                    ApplicationError::Config { .. } => exitcode::CONFIG,
                    ApplicationError::OperationFailed { .. } => exitcode::IOERR,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn given_read_failure_when_mapped_then_ioerr() {
        let err: CliError = ApplicationError::from(DomainError::ReadFailed {
            path: PathBuf::from("a.txt"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        })
        .into();
        assert_eq!(err.exit_code(), exitcode::IOERR);
    }

    #[test]
    fn given_missing_directory_when_mapped_then_noinput() {
        let err: CliError = ApplicationError::NotADirectory(PathBuf::from("nope")).into();
        assert_eq!(err.exit_code(), exitcode::NOINPUT);
        assert_eq!(err.to_string(), "not a directory: nope");
    }

    #[test]
    fn given_config_error_when_mapped_then_config() {
        let err: CliError = ApplicationError::Config {
            message: "bad".into(),
        }
        .into();
        assert_eq!(err.exit_code(), exitcode::CONFIG);
    }

    #[test]
    fn given_stdout_failure_when_mapped_then_ioerr() {
        let err: CliError = InfraError::Io {
            context: "write to stdout".into(),
            source: io::Error::new(io::ErrorKind::BrokenPipe, "closed"),
        }
        .into();
        assert_eq!(err.exit_code(), exitcode::IOERR);
        assert_eq!(err.to_string(), "I/O error: write to stdout");
    }

    #[test]
    fn given_usage_error_when_mapped_then_usage() {
        assert_eq!(CliError::Usage("x".into()).exit_code(), exitcode::USAGE);
    }
}
