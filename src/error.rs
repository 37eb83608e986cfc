//! Error types for systemctl queries, service actions and configuration.

use thiserror::Error;

use crate::app::model::ServiceAction;

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    /// A list or property query could not be run, timed out, exited
    /// non-zero, or produced output that could not be used.
    #[error("systemctl query failed: {diagnostic}")]
    ExternalTool { diagnostic: String },

    /// A start/stop/restart exited non-zero. `diagnostic` is the tool's
    /// own error text, verbatim.
    #[error("failed to {action} {service}: {diagnostic}")]
    ServiceAction {
        service: String,
        action: ServiceAction,
        diagnostic: String,
    },

    /// Rejected before anything was executed.
    #[error("invalid unit name '{name}': {reason}")]
    InvalidUnitName { name: String, reason: &'static str },

    #[error("configuration error: {message}")]
    Config { message: String },
}

/// Failure to run a child process at all, as opposed to a process that ran
/// and exited non-zero.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {timeout_ms} ms")]
    Timeout { program: String, timeout_ms: u128 },

    #[error("failed to wait for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn external(diagnostic: impl Into<String>) -> Self {
        Error::ExternalTool {
            diagnostic: diagnostic.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }
}
