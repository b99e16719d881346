/*!
orchestrator.rs - the `run` workflow.

    Authorizing -> Resolving -> Submitting -> Submitted
                                                 |  (no report requested: done)
                                                 v
                                  Polling <-> sleep
                                     |            \ poll timeout: NotComplete
                                     v
                                  Reporting -> Completed

Any failure ends the run with a `CommandError`, whose text is the reply.
Time is read through [`Clock`] and waiting goes through [`Sleeper`] so the
whole loop can be driven deterministically.
*/

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::alias::{AliasRegistry, JobOptions, JobReference};
use crate::auth::Authorizer;
use crate::cmd::format;
use crate::error::CommandError;
use crate::rundeck::model::{ExecutionHandle, Job};
use crate::rundeck::{OutputWindow, RundeckClient, Transport};

/* ---- Seams ---- */

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Where replies go. One call per chat message.
pub trait Responder {
    fn reply(&mut self, text: String);
}

impl Responder for Vec<String> {
    fn reply(&mut self, text: String) {
        self.push(text);
    }
}

/* ---- Requests ---- */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// Progress messages are only sent once the execution has run this long.
    pub progress_threshold: Duration,
    pub timeout: Option<Duration>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            progress_threshold: Duration::ZERO,
            timeout: None,
        }
    }
}

/// What to send back once the execution finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    All,
    Last(usize),
}

impl FromStr for Report {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Report::All);
        }
        match s.parse::<usize>() {
            Ok(n) if n > 0 => Ok(Report::Last(n)),
            _ => Err(CommandError::BadFormat),
        }
    }
}

/// The job a command names: an alias, an explicit pair, or nothing usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Alias(String),
    Job(JobReference),
    Missing,
}

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub user: String,
    pub target: Target,
    pub options: JobOptions,
    pub report: Option<Report>,
}

/* ---- Resolution (shared with `options`) ---- */

/// Turn a target into a job reference plus the options to send. Alias
/// defaults are merged under `options`; explicit values win.
pub fn resolve_target(
    registry: &AliasRegistry,
    target: &Target,
    options: JobOptions,
) -> Result<(JobReference, JobOptions), CommandError> {
    match target {
        Target::Alias(name) => {
            let alias = registry
                .lookup(name)
                .map_err(|_| CommandError::AliasOrJobNotFound)?;
            let mut merged = alias.default_options.clone();
            merged.extend(options);
            Ok((alias.job_reference(), merged))
        }
        Target::Job(reference) => Ok((reference.clone(), options)),
        Target::Missing => Err(CommandError::AliasOrJobNotFound),
    }
}

/// Look the job up remotely; a miss reads the same as an unknown alias.
pub async fn resolve_job<T: Transport>(
    client: &RundeckClient<T>,
    reference: &JobReference,
) -> Result<Job, CommandError> {
    client
        .find_job(reference)
        .await
        .into_result(CommandError::AliasOrJobNotFound)?
        .ok_or(CommandError::AliasOrJobNotFound)
}

/* ---- State machine ---- */

#[derive(Debug)]
enum RunState {
    Authorizing,
    Resolving,
    Submitting {
        job: Job,
        options: JobOptions,
    },
    Submitted(ExecutionHandle),
    Polling {
        submitted: ExecutionHandle,
        report: Report,
        waited: Duration,
    },
    Reporting {
        id: u64,
        report: Report,
    },
    Completed,
    NotComplete,
}

impl RunState {
    fn name(&self) -> &'static str {
        match self {
            RunState::Authorizing => "authorizing",
            RunState::Resolving => "resolving",
            RunState::Submitting { .. } => "submitting",
            RunState::Submitted(_) => "submitted",
            RunState::Polling { .. } => "polling",
            RunState::Reporting { .. } => "reporting",
            RunState::Completed => "completed",
            RunState::NotComplete => "not-complete",
        }
    }
}

pub struct Orchestrator<'a, T> {
    pub client: &'a RundeckClient<T>,
    pub authorizer: &'a dyn Authorizer,
    pub clock: &'a dyn Clock,
    pub sleeper: &'a dyn Sleeper,
    pub settings: PollSettings,
    /// Group whose members may run jobs.
    pub group: &'a str,
}

impl<T: Transport> Orchestrator<'_, T> {
    /// Drive one `run` command to its end, replying along the way.
    pub async fn run(
        &self,
        registry: &AliasRegistry,
        request: RunRequest,
        out: &mut dyn Responder,
    ) -> Result<(), CommandError> {
        let mut state = RunState::Authorizing;
        loop {
            tracing::trace!(state = state.name(), user = %request.user, "run step");
            state = match state {
                RunState::Authorizing => {
                    if !self.authorizer.user_in_group(&request.user, self.group) {
                        tracing::info!(user = %request.user, group = self.group, "run denied");
                        return Err(CommandError::NotAuthorized);
                    }
                    RunState::Resolving
                }
                RunState::Resolving => {
                    let (reference, options) =
                        resolve_target(registry, &request.target, request.options.clone())?;
                    let job = resolve_job(self.client, &reference).await?;
                    RunState::Submitting { job, options }
                }
                RunState::Submitting { job, options } => {
                    let execution = self
                        .client
                        .submit_run(&job.id, &options, Some(&request.user))
                        .await
                        .into_result(CommandError::AliasOrJobNotFound)?;
                    tracing::info!(
                        id = execution.id,
                        job = %job.name,
                        job_id = %job.id,
                        group = job.group.as_deref().unwrap_or_default(),
                        "execution submitted"
                    );
                    RunState::Submitted(execution)
                }
                RunState::Submitted(execution) => {
                    out.reply(format::submitted(&execution));
                    match request.report {
                        None => RunState::Completed,
                        Some(report) => RunState::Polling {
                            submitted: execution,
                            report,
                            waited: Duration::ZERO,
                        },
                    }
                }
                RunState::Polling {
                    submitted,
                    report,
                    waited,
                } => self.poll(submitted, report, waited, out).await?,
                RunState::Reporting { id, report } => {
                    let page = match report {
                        Report::All => self.client.fetch_full_output(id).await,
                        Report::Last(n) => {
                            self.client.get_output(id, OutputWindow::LastLines(n)).await
                        }
                    }
                    .into_result(CommandError::ExecutionNotFound)?;
                    out.reply(format::output_page(&page));
                    RunState::Completed
                }
                RunState::Completed | RunState::NotComplete => return Ok(()),
            };
        }
    }

    /// One check of a submitted execution.
    async fn poll(
        &self,
        submitted: ExecutionHandle,
        report: Report,
        waited: Duration,
        out: &mut dyn Responder,
    ) -> Result<RunState, CommandError> {
        let current = self
            .client
            .get_execution(submitted.id)
            .await
            .into_result(CommandError::ExecutionNotFound)?;
        if current.status.is_terminal() {
            tracing::debug!(
                id = current.id,
                job_id = ?current.job_id,
                status = %current.status,
                duration = ?current.duration(),
                "execution finished"
            );
            return Ok(RunState::Reporting {
                id: current.id,
                report,
            });
        }

        let started = current.started_at.or(submitted.started_at);
        let elapsed = started
            .and_then(|s| (self.clock.now() - s).to_std().ok())
            .unwrap_or_default();

        if let Some(limit) = self.settings.timeout
            && waited >= limit
        {
            out.reply(format::stopped_waiting(current.id, elapsed));
            return Ok(RunState::NotComplete);
        }
        if elapsed >= self.settings.progress_threshold {
            out.reply(format::still_running(
                current.id,
                elapsed,
                submitted.average_duration,
            ));
        }

        self.sleeper.sleep(self.settings.interval).await;
        Ok(RunState::Polling {
            submitted,
            report,
            waited: waited + self.settings.interval,
        })
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use super::*;

    /// A clock stuck at one instant.
    pub struct FixedClock(pub DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    /// Records requested sleeps without waiting.
    #[derive(Default)]
    pub struct RecordingSleeper {
        pub slept: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn count(&self) -> usize {
            self.slept.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    pub fn at(ts: &str) -> FixedClock {
        FixedClock(ts.parse().unwrap())
    }
}
