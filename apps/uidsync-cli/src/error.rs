//! CLI error types and exit codes
//!
//! - 0: success
//! - 1: general failure (precondition, configuration, prompt)
//! - 2: invalid mapping file (`check` found broken rows)
//! - N: a failed external command's own status

use thiserror::Error;
use uidsync_core::error::CoreError;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Must be run as root (effective uid is {0})")]
    NotRoot(u32),

    #[error("Mapping file has {0} problem(s)")]
    InvalidMapping(usize),

    #[error("I/O error: {0}")]
    Io(String),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Core(e) => e.exit_code(),
            CliError::InvalidMapping(_) => 2,
            CliError::Config(_) | CliError::NotRoot(_) | CliError::Io(_) => 1,
        }
    }

    /// Print the error to stderr with appropriate formatting
    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();

        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {}", self);
        } else {
            eprintln!("Error: {}", self);
        }

        // the failed command's own diagnostics, verbatim
        if let CliError::Core(CoreError::CommandFailed { stderr, .. }) = self {
            if !stderr.is_empty() {
                eprintln!("{stderr}");
            }
        }

        if let Some(suggestion) = self.suggestion() {
            if use_color {
                eprintln!("\n\x1b[33mSuggestion:\x1b[0m {}", suggestion);
            } else {
                eprintln!("\nSuggestion: {}", suggestion);
            }
        }
    }

    fn suggestion(&self) -> Option<&'static str> {
        match self {
            CliError::NotRoot(_) => Some("Re-run with sudo, or use 'uidsync check' to validate the mapping without root."),
            CliError::InvalidMapping(_) => Some("Fix the reported rows; broken rows are skipped by 'uidsync sync'."),
            CliError::Core(CoreError::MappingUnreadable { .. }) => {
                Some("Pass --mapping to point at the uid mapping file.")
            }
            CliError::Core(CoreError::CommandFailed { .. }) => {
                Some("Fix the cause and re-run; completed steps are skipped on the next run.")
            }
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e.to_string())
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(e: serde_yaml::Error) -> Self {
        CliError::Config(format!("YAML error: {}", e))
    }
}
