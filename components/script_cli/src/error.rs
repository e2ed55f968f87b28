//! Error types for the CLI.

use core_types::ScriptError;
use std::fmt;

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    /// Script compilation or execution error.
    Script(ScriptError),

    /// File I/O error.
    Io(std::io::Error),

    /// REPL error.
    Repl(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Script(e) => write!(f, "script error: {}", e),
            CliError::Io(e) => write!(f, "file error: {}", e),
            CliError::Repl(s) => write!(f, "REPL error: {}", s),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Io(e) => Some(e),
            CliError::Script(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ScriptError> for CliError {
    fn from(err: ScriptError) -> Self {
        CliError::Script(err)
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err)
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
