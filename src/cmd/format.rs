/*!
format.rs

Reply rendering for chat output.

Every function here returns the exact text of one chat reply; nothing prints.
The reply formats are a contract with the people reading the channel, so they
are plain text without colour. `StyleOptions` / `color` only decorate the
console transport's own prompt and notices (NO_COLOR disables them).

Public API Summary:
  - seconds(duration)              -> "10.348"
  - output_page(page)              -> "Execution 285 output:\n  ..."
  - execution_line(exec)           -> "285 succeeded Shell User [Litatest] dateoutput ..."
  - execution_list(execs, limit)
  - project_list / job_list / alias_list / job_options / system_info
*/

use std::time::Duration;

use crate::alias::{Alias, JobReference};
use crate::rundeck::ServerSpec;
use crate::rundeck::model::{ExecutionHandle, Job, JobDefinition, OutputPage, Project, SystemInfo};

pub const NO_PROJECTS: &str = "No projects found";
pub const NO_JOBS: &str = "No jobs found";
pub const NO_EXECUTIONS: &str = "No executions found";
pub const NO_ALIASES: &str = "No aliases have been registered yet";

/* -------------------------------------------------------------------------- */
/* Durations                                                                  */
/* -------------------------------------------------------------------------- */

/// Millisecond precision seconds, trailing zeros trimmed but always with one
/// decimal: 10348ms -> "10.348", 3750ms -> "3.75", 2000ms -> "2.0".
pub fn seconds(d: Duration) -> String {
    let ms = d.as_millis();
    let (whole, frac) = (ms / 1000, ms % 1000);
    if frac == 0 {
        return format!("{whole}.0");
    }
    let frac = format!("{frac:03}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

pub fn whole_seconds(d: Duration) -> u64 {
    d.as_secs()
}

/* -------------------------------------------------------------------------- */
/* Output pages                                                               */
/* -------------------------------------------------------------------------- */

pub fn output_page(page: &OutputPage) -> String {
    let id = page.execution_id;
    let mut out = vec![format!("Execution {id} output:")];
    out.extend(
        page.lines
            .iter()
            .map(|l| format!("  {} {}", l.timestamp, l.text)),
    );
    out.push(if page.completed {
        format!("Execution {id} is complete (took {}s)", seconds(page.elapsed))
    } else {
        format!("Execution {id} is not complete (running {}s)", seconds(page.elapsed))
    });
    out.join("\n")
}

/* -------------------------------------------------------------------------- */
/* Executions                                                                 */
/* -------------------------------------------------------------------------- */

pub fn submitted(exec: &ExecutionHandle) -> String {
    match exec.average_duration {
        Some(avg) => format!(
            "Execution {} is running. Average job duration is {} seconds.",
            exec.id,
            seconds(avg)
        ),
        None => format!("Execution {} is running.", exec.id),
    }
}

pub fn still_running(id: u64, elapsed: Duration, average: Option<Duration>) -> String {
    format!(
        "Execution {id} has been running for {}s ({}s average)",
        whole_seconds(elapsed),
        whole_seconds(average.unwrap_or_default())
    )
}

pub fn stopped_waiting(id: u64, elapsed: Duration) -> String {
    format!(
        "Execution {id} is still running after {}s; stopped waiting",
        whole_seconds(elapsed)
    )
}

/// `-SECONDS 60 -MODE "a b"` -> `["SECONDS:60", "MODE:a b"]`.
pub fn option_pairs(argstring: &str) -> Vec<String> {
    let tokens = shell_words::split(argstring).unwrap_or_else(|_| {
        argstring
            .split_whitespace()
            .map(str::to_string)
            .collect()
    });

    let mut pairs = Vec::new();
    let mut iter = tokens.into_iter().peekable();
    while let Some(tok) = iter.next() {
        let Some(name) = tok.strip_prefix('-') else {
            continue;
        };
        let value = match iter.peek() {
            Some(next) if !is_option_name(next) => iter.next().unwrap_or_default(),
            _ => String::new(),
        };
        pairs.push(format!("{name}:{value}"));
    }
    pairs
}

/// `-NAME` starts a new option; `-5` or a lone `-` is a value.
fn is_option_name(token: &str) -> bool {
    token
        .strip_prefix('-')
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| !c.is_ascii_digit() && c != '.')
}

pub fn execution_line(exec: &ExecutionHandle) -> String {
    let mut parts = vec![
        exec.id.to_string(),
        exec.status.to_string(),
        exec.user.clone(),
        format!("[{}]", exec.project),
    ];
    if let Some(job) = &exec.job {
        parts.push(job.clone());
    }
    if let Some(args) = &exec.argstring {
        parts.extend(option_pairs(args));
    }
    if let Some(start) = exec.started_at {
        parts.push(format!("start:{}", timestamp(start)));
    }
    if let Some(end) = exec.ended_at {
        parts.push(format!("end:{}", timestamp(end)));
    }
    parts.join(" ")
}

/// Render executions in the given order, keeping only the last `limit` entries.
pub fn execution_list(execs: &[ExecutionHandle], limit: Option<usize>) -> String {
    if execs.is_empty() {
        return NO_EXECUTIONS.to_string();
    }
    let skip = limit.map_or(0, |n| execs.len().saturating_sub(n));
    execs[skip..]
        .iter()
        .map(execution_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn timestamp(t: chrono::DateTime<chrono::Utc>) -> String {
    t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/* -------------------------------------------------------------------------- */
/* Listings                                                                   */
/* -------------------------------------------------------------------------- */

pub fn system_info(info: &SystemInfo, users: &[String], group: &str, robot: &str) -> String {
    let users_line = if users.is_empty() {
        format!(
            "No users are currently allowed to execute jobs. Ask an admin to '{robot} add CHAT_ID {group}'"
        )
    } else {
        format!("Users allowed to execute jobs: {}", users.join(", "))
    };
    format!(
        "System Stats for Rundeck {} on node {}\n{users_line}",
        info.version, info.node
    )
}

pub fn project_list(server: &ServerSpec, projects: &[Project]) -> String {
    if projects.is_empty() {
        return NO_PROJECTS.to_string();
    }
    projects
        .iter()
        .map(|p| format!("[{}] - {}", p.name, server.project_url(&p.name)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line per job; `alias_of` names the alias pointing at a job, if any.
pub fn job_list<'a>(jobs: &[Job], alias_of: impl Fn(&Job) -> Option<&'a str>) -> String {
    if jobs.is_empty() {
        return NO_JOBS.to_string();
    }
    jobs.iter()
        .map(|j| match alias_of(j) {
            Some(alias) => format!("{alias} = [{}] - {}", j.project, j.name),
            None => format!("[{}] - {}", j.project, j.name),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn alias_list<'a>(aliases: impl IntoIterator<Item = &'a Alias>) -> String {
    let rows: Vec<String> = aliases
        .into_iter()
        .map(|a| {
            let mut row = format!(" {} = [{}] - {}", a.name, a.project, a.job);
            if !a.default_options.is_empty() {
                row.push_str(" - ");
                for (k, v) in &a.default_options {
                    row.push_str(&format!("{k}={v} - "));
                }
            }
            row
        })
        .collect();
    if rows.is_empty() {
        return NO_ALIASES.to_string();
    }
    format!("Alias = [Project] - Job\n{}", rows.join("\n"))
}

pub fn job_options(reference: &JobReference, definition: &JobDefinition) -> String {
    let mut out = vec![format!("[{}] - {}", reference.project, reference.job)];
    for opt in &definition.options {
        let required = if opt.required { " (REQUIRED)" } else { "" };
        out.push(format!(
            "  * {}{required} {}",
            opt.name,
            opt.description.as_deref().unwrap_or_default()
        ));
    }
    out.join("\n")
}

/* -------------------------------------------------------------------------- */
/* Console styling                                                            */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Clone)]
pub struct StyleOptions {
    pub use_color: bool,
}

impl StyleOptions {
    pub fn detect() -> Self {
        StyleOptions {
            use_color: std::env::var_os("NO_COLOR").is_none(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Role {
    Primary,
    Dim,
}

pub fn color(role: Role, text: impl AsRef<str>, style: &StyleOptions) -> String {
    if !style.use_color {
        return text.as_ref().to_string();
    }
    let code = match role {
        Role::Primary => "38;5;45", // cyan-ish
        Role::Dim => "2",           // faint
    };
    format!("\x1b[{code}m{}\x1b[0m", text.as_ref())
}

/* -------------------------------------------------------------------------- */
/* Tests                                                                       */
/* -------------------------------------------------------------------------- */
