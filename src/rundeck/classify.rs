/*!
classify.rs - turn a raw Rundeck response into a typed `Outcome`.

Every endpoint funnels its body through [`classify`]. Error documents are
recognised first, in a fixed priority:

  1. not XML                  -> Unparseable
  2. token / ACL rejection    -> Unauthorized
  3. job already running      -> Conflict
  4. option validation        -> InvalidOptions
  5. execution / job missing  -> NotFound
  6. any other error document -> Failure

Only then is the endpoint's payload decoded through its [`Payload`] impl.
A payload that does not decode is reported as `Unparseable` as well.
*/

use std::time::Duration;

use chrono::{DateTime, Utc};
use roxmltree::{Document, Node};

use super::model::{
    ExecutionHandle, ExecutionStatus, Job, JobDefinition, JobOption, OptionViolation, OutputLine,
    OutputPage, Project, SystemInfo,
};
use crate::error::CommandError;

/// Result of one remote call, after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Success(T),
    InvalidOptions(Vec<OptionViolation>),
    Conflict(String),
    Unauthorized(String),
    NotFound(String),
    Failure(String),
    Unparseable(String),
}

impl<T> Outcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        self.and_then(|v| Outcome::Success(f(v)))
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Outcome<U>) -> Outcome<U> {
        match self {
            Outcome::Success(v) => f(v),
            Outcome::InvalidOptions(v) => Outcome::InvalidOptions(v),
            Outcome::Conflict(m) => Outcome::Conflict(m),
            Outcome::Unauthorized(m) => Outcome::Unauthorized(m),
            Outcome::NotFound(m) => Outcome::NotFound(m),
            Outcome::Failure(m) => Outcome::Failure(m),
            Outcome::Unparseable(m) => Outcome::Unparseable(m),
        }
    }

    /// Short tag for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::InvalidOptions(_) => "invalid-options",
            Outcome::Conflict(_) => "conflict",
            Outcome::Unauthorized(_) => "unauthorized",
            Outcome::NotFound(_) => "not-found",
            Outcome::Failure(_) => "failure",
            Outcome::Unparseable(_) => "unparseable",
        }
    }

    /// Convert into the command error taxonomy. `not_found` is what a missing
    /// item means for the caller (missing job vs missing execution).
    pub fn into_result(self, not_found: CommandError) -> Result<T, CommandError> {
        match self {
            Outcome::Success(v) => Ok(v),
            Outcome::InvalidOptions(violations) => {
                Err(CommandError::InvalidOptions(join_violations(&violations)))
            }
            Outcome::Conflict(_) => Err(CommandError::Conflict),
            Outcome::Unauthorized(_) => Err(CommandError::Unauthorized),
            Outcome::NotFound(_) => Err(not_found),
            Outcome::Failure(m) => Err(CommandError::Remote(m)),
            Outcome::Unparseable(m) => Err(CommandError::Unparseable(m)),
        }
    }
}

pub fn join_violations(violations: &[OptionViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A document type one endpoint returns on success.
pub trait Payload: Sized {
    fn decode(root: Node<'_, '_>) -> Result<Self, String>;
}

/// Classify a response body. Pure and infallible.
pub fn classify<T: Payload>(body: &str, status: u16) -> Outcome<T> {
    let doc = match Document::parse(body) {
        Ok(doc) => doc,
        Err(e) => return Outcome::Unparseable(format!("not XML (HTTP {status}): {e}")),
    };
    let root = doc.root_element();

    if let Some(report) = ErrorReport::extract(root, status) {
        return report.into_outcome();
    }

    match T::decode(root) {
        Ok(v) => Outcome::Success(v),
        Err(e) => Outcome::Unparseable(e),
    }
}

/* ---- Error documents ---- */

struct ErrorReport {
    status: u16,
    code: String,
    message: String,
}

impl ErrorReport {
    fn extract(root: Node<'_, '_>, status: u16) -> Option<Self> {
        let flagged = root.attribute("error") == Some("true");
        let error_el = find(root, "error");
        if !flagged && error_el.is_none() && status < 400 {
            return None;
        }

        let code = error_el
            .and_then(|e| e.attribute("code"))
            .unwrap_or_default()
            .to_ascii_lowercase();
        let message = error_el
            .and_then(|e| child_text(e, "message").or_else(|| text_of(e)))
            .unwrap_or_else(|| format!("HTTP {status}"));
        Some(Self {
            status,
            code,
            message,
        })
    }

    fn into_outcome<T>(self) -> Outcome<T> {
        let msg = self.message.to_ascii_lowercase();
        let code = self.code.as_str();

        if matches!(self.status, 401 | 403)
            || code.contains("unauthorized")
            || msg.contains("not authorized")
            || msg.contains("unauthorized")
        {
            return Outcome::Unauthorized(self.message);
        }
        if self.status == 409
            || code.contains("conflict")
            || msg.contains("currently being executed")
            || msg.contains("already running")
        {
            return Outcome::Conflict(self.message);
        }
        if code.contains("options-invalid")
            || msg.contains("options were not valid")
            || msg.contains("doesn't match")
        {
            return Outcome::InvalidOptions(parse_violations(&self.message));
        }
        if self.status == 404
            || code.contains("doesnotexist")
            || code.contains("not-found")
            || msg.contains("does not exist")
            || msg.contains("not found")
        {
            return Outcome::NotFound(self.message);
        }
        Outcome::Failure(self.message)
    }
}

/// Split "Job options were not valid: Option 'A' doesn't match ..., value: x"
/// (one violation per line) into structured violations.
fn parse_violations(message: &str) -> Vec<OptionViolation> {
    let detail = message
        .split_once("not valid:")
        .map(|(_, rest)| rest)
        .unwrap_or(message);

    let violations: Vec<_> = detail
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(parse_violation)
        .collect();

    if violations.is_empty() {
        vec![OptionViolation::Other(message.trim().to_string())]
    } else {
        violations
    }
}

fn parse_violation(line: &str) -> OptionViolation {
    let parsed = line.strip_prefix("Option '").and_then(|rest| {
        let (name, rest) = rest.split_once("' doesn't match ")?;
        let (constraint, value) = rest.rsplit_once(", value: ")?;
        Some(OptionViolation::Mismatch {
            name: name.to_string(),
            constraint: constraint.to_string(),
            value: value.to_string(),
        })
    });
    parsed.unwrap_or_else(|| OptionViolation::Other(line.to_string()))
}

/* ---- Payloads ---- */

impl Payload for SystemInfo {
    fn decode(root: Node<'_, '_>) -> Result<Self, String> {
        let rundeck = find(root, "rundeck").ok_or("missing <rundeck> system section")?;
        Ok(SystemInfo {
            version: child_text(rundeck, "version").ok_or("missing rundeck version")?,
            node: child_text(rundeck, "node").unwrap_or_default(),
        })
    }
}

impl Payload for Vec<Project> {
    fn decode(root: Node<'_, '_>) -> Result<Self, String> {
        let projects = find(root, "projects").ok_or("missing <projects> element")?;
        Ok(elements(projects, "project")
            .filter_map(|p| child_text(p, "name"))
            .map(|name| Project { name })
            .collect())
    }
}

impl Payload for Vec<Job> {
    fn decode(root: Node<'_, '_>) -> Result<Self, String> {
        let jobs = find(root, "jobs").ok_or("missing <jobs> element")?;
        elements(jobs, "job")
            .map(|j| -> Result<Job, String> {
                Ok(Job {
                    id: j.attribute("id").ok_or("job without id")?.to_string(),
                    name: child_text(j, "name").ok_or("job without name")?,
                    group: child_text(j, "group"),
                    project: child_text(j, "project").unwrap_or_default(),
                })
            })
            .collect()
    }
}

impl Payload for Vec<ExecutionHandle> {
    fn decode(root: Node<'_, '_>) -> Result<Self, String> {
        let executions = find(root, "executions").ok_or("missing <executions> element")?;
        elements(executions, "execution")
            .map(decode_execution)
            .collect()
    }
}

fn decode_execution(node: Node<'_, '_>) -> Result<ExecutionHandle, String> {
    let id = node
        .attribute("id")
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or("execution without numeric id")?;
    let job = child(node, "job");
    let project = node
        .attribute("project")
        .map(str::to_string)
        .or_else(|| job.and_then(|j| child_text(j, "project")))
        .unwrap_or_default();

    Ok(ExecutionHandle {
        id,
        project,
        job: job.and_then(|j| child_text(j, "name")),
        job_id: job.and_then(|j| j.attribute("id")).map(str::to_string),
        status: ExecutionStatus::parse(node.attribute("status").unwrap_or("unknown")),
        user: child_text(node, "user").unwrap_or_default(),
        started_at: child(node, "date-started").and_then(timestamp),
        ended_at: child(node, "date-ended").and_then(timestamp),
        argstring: child_text(node, "argstring"),
        average_duration: job
            .and_then(|j| j.attribute("averageDuration"))
            .and_then(|ms| ms.parse::<u64>().ok())
            .map(Duration::from_millis),
    })
}

impl Payload for JobDefinition {
    fn decode(root: Node<'_, '_>) -> Result<Self, String> {
        let job = find(root, "job").ok_or("missing <job> definition")?;
        let context = child(job, "context");
        let options = context
            .and_then(|c| child(c, "options"))
            .map(|opts| {
                elements(opts, "option")
                    .filter_map(|o| {
                        Some(JobOption {
                            name: o.attribute("name")?.to_string(),
                            required: o.attribute("required") == Some("true"),
                            description: child_text(o, "description"),
                            regex: o.attribute("regex").map(str::to_string),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(JobDefinition {
            id: child_text(job, "id")
                .or_else(|| child_text(job, "uuid"))
                .unwrap_or_default(),
            name: child_text(job, "name").ok_or("job definition without name")?,
            project: context
                .and_then(|c| child_text(c, "project"))
                .unwrap_or_default(),
            options,
        })
    }
}

impl Payload for OutputPage {
    fn decode(root: Node<'_, '_>) -> Result<Self, String> {
        let output = find(root, "output").ok_or("missing <output> element")?;
        let execution_id = child_text(output, "id")
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or("output without execution id")?;
        let log_complete = child_text(output, "completed").as_deref() == Some("true");
        let completed = child_text(output, "execCompleted")
            .map(|s| s == "true")
            .unwrap_or(log_complete);
        let lines = child(output, "entries")
            .map(|entries| {
                elements(entries, "entry")
                    .map(|e| OutputLine {
                        timestamp: e.attribute("time").unwrap_or_default().to_string(),
                        text: e.attribute("log").unwrap_or_default().to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(OutputPage {
            execution_id,
            lines,
            completed,
            log_complete,
            offset: child_text(output, "offset")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            elapsed: Duration::from_millis(
                child_text(output, "execDuration")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0),
            ),
        })
    }
}

/* ---- Node helpers ---- */

fn find<'a, 'i>(root: Node<'a, 'i>, name: &str) -> Option<Node<'a, 'i>> {
    root.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn child<'a, 'i>(node: Node<'a, 'i>, name: &str) -> Option<Node<'a, 'i>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn elements<'a, 'i>(node: Node<'a, 'i>, name: &'static str) -> impl Iterator<Item = Node<'a, 'i>> {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

fn text_of(node: Node<'_, '_>) -> Option<String> {
    let text: String = node
        .children()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn child_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    child(node, name).and_then(text_of)
}

fn timestamp(node: Node<'_, '_>) -> Option<DateTime<Utc>> {
    text_of(node)
        .and_then(|t| DateTime::parse_from_rfc3339(&t).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            node.attribute("unixtime")
                .and_then(|ms| ms.parse::<i64>().ok())
                .and_then(DateTime::from_timestamp_millis)
        })
}
