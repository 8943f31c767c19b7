//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
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
            CliError::InvalidArgs(_) => crate::exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => crate::exitcode::IOERR,
                InfraError::Application(app) => match app {
                    ApplicationError::Config { .. } => crate::exitcode::CONFIG,
                    ApplicationError::NoTreeFile => crate::exitcode::USAGE,
                    ApplicationError::OperationFailed { .. } => crate::exitcode::NOINPUT,
                    ApplicationError::SubtreeNotFound { .. } => crate::exitcode::DATAERR,
                    ApplicationError::Domain(_) => crate::exitcode::DATAERR,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;
    use rstest::rstest;

    #[rstest]
    #[case(ApplicationError::NoTreeFile, crate::exitcode::USAGE)]
    #[case(ApplicationError::Config { message: "x".into() }, crate::exitcode::CONFIG)]
    #[case(ApplicationError::Domain(DomainError::InvalidTree("x".into())), crate::exitcode::DATAERR)]
    fn test_exit_code(#[case] error: ApplicationError, #[case] expected: i32) {
        assert_eq!(CliError::from(error).exit_code(), expected);
    }

    #[test]
    fn given_cli_level_errors_when_mapping_then_usage_and_ioerr() {
        let io = InfraError::io("print help", std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert_eq!(CliError::from(io).exit_code(), crate::exitcode::IOERR);
        assert_eq!(
            CliError::InvalidArgs("x".into()).exit_code(),
            crate::exitcode::USAGE
        );
    }
}
