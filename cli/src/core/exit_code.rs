use crate::core::error::DothttpError;

/// Process exit codes of the dothttp CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General/unspecified error
    GeneralError = 1,
    /// Invalid command line usage
    UsageError = 2,
    /// Syntax error in the http file
    SyntaxError = 3,
    /// Property or target resolution error
    ResolutionError = 4,
    /// Network or HTTP error
    NetworkError = 5,
}

impl ExitCode {
    pub fn code(&self) -> i32 {
        *self as i32
    }
}

impl From<&DothttpError> for ExitCode {
    fn from(error: &DothttpError) -> Self {
        match error {
            DothttpError::Syntax(_) | DothttpError::DuplicateTarget(_) => ExitCode::SyntaxError,
            DothttpError::CommandLinePropMalformed(_) => ExitCode::UsageError,
            DothttpError::PropertyNotFound { .. }
            | DothttpError::PropertyConflict(_)
            | DothttpError::PropertyFileInvalid { .. }
            | DothttpError::TargetNotFound(_)
            | DothttpError::UndefinedBase { .. }
            | DothttpError::CircularBase { .. } => ExitCode::ResolutionError,
            DothttpError::Network(_) => ExitCode::NetworkError,
            DothttpError::FileNotFound { .. }
            | DothttpError::PayloadInvalid(_)
            | DothttpError::ScriptCompile { .. }
            | DothttpError::ScriptRuntime { .. }
            | DothttpError::AuthConfigIncomplete(_)
            | DothttpError::Io(_)
            | DothttpError::Generic(_) => ExitCode::GeneralError,
        }
    }
}
