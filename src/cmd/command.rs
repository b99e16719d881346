/*!
command.rs - chat grammar.

A chat line is tokenized like a shell command line (`shell-words`) and parsed
with clap, so quoting and `--flag value` handling match what people type:

  rundeck run deploy --options "MSG=hello world,LEVEL=2" --report 5

The leading trigger word `rundeck` is optional. Anything clap rejects is a
`BadFormat` reply; clap's own error text never reaches chat.
*/

use clap::{CommandFactory, Parser, Subcommand};

use crate::alias::{JobOptions, JobReference};
use crate::error::CommandError;
use crate::orchestrator::{Report, Target};

/// Trigger word that may prefix every command.
pub const TRIGGER: &str = "rundeck";

/// Default number of log lines for `output`.
pub const DEFAULT_OUTPUT_LINES: usize = 10;

#[derive(Parser, Debug)]
#[command(
    name = "rundeck",
    about = "Run and inspect Rundeck jobs from chat",
    disable_help_subcommand = true,
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct ChatCli {
    #[command(subcommand)]
    pub command: ChatCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Server version, node and the users allowed to run jobs
    Info,

    /// List projects
    Projects,

    /// List jobs of every project
    Jobs,

    /// Recent executions, optionally only the last LIMIT
    Executions {
        #[arg(value_parser = positive_count)]
        limit: Option<usize>,
    },

    /// Executions currently running
    Running,

    /// List registered aliases
    Aliases,

    /// Register or forget an alias
    Alias {
        #[command(subcommand)]
        action: AliasAction,
    },

    /// Run a job by alias or by --project/--job
    Run {
        alias: Option<String>,
        #[command(flatten)]
        job: JobArgs,
        /// Comma separated NAME=value pairs
        #[arg(long, value_parser = parse_options)]
        options: Option<JobOptions>,
        /// Wait for the end and report `all` of the log or its last N lines
        #[arg(long)]
        report: Option<Report>,
    },

    /// Show the options a job accepts
    Options {
        alias: Option<String>,
        #[command(flatten)]
        job: JobArgs,
    },

    /// Show the last lines of an execution's log
    Output { id: u64, lines: Option<usize> },

    /// Show this help
    Help,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum AliasAction {
    Register {
        name: String,
        #[command(flatten)]
        job: JobArgs,
        #[arg(long, value_parser = parse_options)]
        options: Option<JobOptions>,
    },
    Forget {
        name: String,
    },
}

#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct JobArgs {
    #[arg(long)]
    pub project: Option<String>,
    #[arg(long)]
    pub job: Option<String>,
}

impl JobArgs {
    /// Both halves given explicitly.
    pub fn reference(&self) -> Option<JobReference> {
        match (&self.project, &self.job) {
            (Some(p), Some(j)) => Some(JobReference::new(p.as_str(), j.as_str())),
            _ => None,
        }
    }
}

/// An alias wins over explicit flags; half a pair resolves to nothing.
pub fn target(alias: Option<&str>, job: &JobArgs) -> Target {
    match (alias, job.reference()) {
        (Some(name), _) => Target::Alias(name.to_string()),
        (None, Some(reference)) => Target::Job(reference),
        (None, None) => Target::Missing,
    }
}

/// `SECONDS=60,MODE=fast` -> {MODE: fast, SECONDS: 60}
pub fn parse_options(raw: &str) -> Result<JobOptions, CommandError> {
    let mut out = JobOptions::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, value) = pair.split_once('=').ok_or(CommandError::BadFormat)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(CommandError::BadFormat);
        }
        out.insert(name.to_string(), value.trim().to_string());
    }
    Ok(out)
}

/// A count of entries to keep; zero would leave nothing to say.
fn positive_count(raw: &str) -> Result<usize, CommandError> {
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(CommandError::BadFormat),
    }
}

/// Parse one chat line.
pub fn parse(text: &str) -> Result<ChatCommand, CommandError> {
    let mut words = shell_words::split(text).map_err(|_| CommandError::BadFormat)?;
    if words
        .first()
        .is_some_and(|w| w.eq_ignore_ascii_case(TRIGGER))
    {
        words.remove(0);
    }
    if words.is_empty() {
        return Err(CommandError::BadFormat);
    }

    ChatCli::try_parse_from(std::iter::once(TRIGGER.to_string()).chain(words))
        .map(|cli| cli.command)
        .map_err(|e| {
            tracing::debug!(kind = ?e.kind(), "chat command rejected");
            CommandError::BadFormat
        })
}

/// Usage text for the `help` command.
pub fn help_text() -> String {
    ChatCli::command().render_help().to_string()
}
