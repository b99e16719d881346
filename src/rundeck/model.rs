//! Typed views of the Rundeck API documents this crate consumes.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    pub version: String,
    pub node: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: String,
    pub name: String,
    pub group: Option<String>,
    pub project: String,
}

/// One option declared by a job definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOption {
    pub name: String,
    pub required: bool,
    pub description: Option<String>,
    pub regex: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDefinition {
    pub id: String,
    pub name: String,
    pub project: String,
    pub options: Vec<JobOption>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    Running,
    Succeeded,
    Failed,
    Aborted,
    /// Any state this client does not model (`timedout`, `scheduled`, ...).
    Unknown(String),
}

impl ExecutionStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "running" => ExecutionStatus::Running,
            "succeeded" => ExecutionStatus::Succeeded,
            "failed" => ExecutionStatus::Failed,
            "aborted" => ExecutionStatus::Aborted,
            other => ExecutionStatus::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ExecutionStatus::Running => "running",
            ExecutionStatus::Succeeded => "succeeded",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Aborted => "aborted",
            ExecutionStatus::Unknown(raw) => raw,
        }
    }

    /// Terminal means the remote will not change this execution again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Succeeded | ExecutionStatus::Failed | ExecutionStatus::Aborted
        )
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one execution as reported by the server. Never mutated; every
/// poll produces a fresh handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionHandle {
    pub id: u64,
    pub project: String,
    /// Job name; ad-hoc executions have none.
    pub job: Option<String>,
    pub job_id: Option<String>,
    pub status: ExecutionStatus,
    pub user: String,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Raw `-NAME value` argument string.
    pub argstring: Option<String>,
    /// Historical average duration of the job, when the server knows it.
    pub average_duration: Option<Duration>,
}

impl ExecutionHandle {
    pub fn duration(&self) -> Option<Duration> {
        let started = self.started_at?;
        let ended = self.ended_at?;
        (ended - started).to_std().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    /// `HH:MM:SS`
    pub timestamp: String,
    pub text: String,
}

/// A window of an execution's log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPage {
    pub execution_id: u64,
    pub lines: Vec<OutputLine>,
    /// The execution itself has finished.
    pub completed: bool,
    /// The whole log has been delivered up to `offset`.
    pub log_complete: bool,
    /// Byte offset to resume reading from.
    pub offset: u64,
    /// Total duration when completed, time running so far otherwise.
    pub elapsed: Duration,
}

/// One rejected job option from a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionViolation {
    Mismatch {
        name: String,
        constraint: String,
        value: String,
    },
    /// Server text that did not follow the usual shape; kept verbatim.
    Other(String),
}

impl fmt::Display for OptionViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionViolation::Mismatch {
                name,
                constraint,
                value,
            } => write!(f, "Option '{name}' doesn't match {constraint}, value: {value}"),
            OptionViolation::Other(text) => f.write_str(text),
        }
    }
}
