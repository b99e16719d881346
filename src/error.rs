//! Error taxonomy for chat commands.
//!
//! The `Display` text of every variant is the exact reply sent back to chat,
//! so the handler can turn any failure into one line with `to_string()`.

use thiserror::Error;

/// Failures raised by the alias registry. Detected locally, before any
/// remote call is made.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AliasError {
    #[error("Alias already exists")]
    AlreadyExists(String),

    #[error("Format is bad, see help for more info")]
    BadFormat,

    #[error("Alias not found")]
    NotFound(String),
}

/// Failures of the run / options / output workflows.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("You aren't authorized to run jobs")]
    NotAuthorized,

    #[error("Can't find an alias or project and job")]
    AliasOrJobNotFound,

    #[error("Format is bad, see help for more info")]
    BadFormat,

    #[error("Job is already running and only allows one execution at a time.")]
    Conflict,

    #[error("Job options were not valid: {0}")]
    InvalidOptions(String),

    #[error("API token is unauthorized or lacks runAs permission; check the apitoken.aclpolicy")]
    Unauthorized,

    #[error("Can't find execution for this command")]
    ExecutionNotFound,

    /// The server answered with something that is not XML (or not the
    /// document we asked for). Logged, never replied.
    #[error("response could not be parsed: {0}")]
    Unparseable(String),

    #[error("Rundeck request failed: {0}")]
    Remote(String),
}

impl CommandError {
    /// Whether this failure should produce a chat reply at all.
    pub fn is_silent(&self) -> bool {
        matches!(self, CommandError::Unparseable(_))
    }
}
