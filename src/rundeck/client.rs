/*!
client.rs - one method per Rundeck endpoint.

`RundeckClient` builds the request, hands it to a [`Transport`], and runs the
body through [`classify`]. It never caches and never retries: a transport
error becomes `Outcome::Failure` straight away.
*/

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use url::Url;

use super::classify::{Outcome, Payload, classify};
use super::model::{ExecutionHandle, Job, JobDefinition, OutputPage, Project, SystemInfo};
use crate::alias::{JobOptions, JobReference};

/// Raw HTTP answer: status plus body text.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid request path '{0}'")]
    BadPath(String),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// The only network seam. `path` is relative to the API base URL.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, path: &str, query: &[(String, String)])
    -> Result<RawResponse, TransportError>;
}

/// reqwest-backed transport carrying the static API token.
pub struct HttpTransport {
    client: Client,
    base: Url,
    token: String,
    debug: bool,
}

impl HttpTransport {
    pub fn new(
        base: Url,
        token: String,
        timeout: Duration,
        debug: bool,
    ) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base,
            token,
            debug,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<RawResponse, TransportError> {
        let url = self
            .base
            .join(path)
            .map_err(|_| TransportError::BadPath(path.to_string()))?;
        if self.debug {
            tracing::debug!(%url, ?query, "rundeck request");
        }

        let resp = self
            .client
            .get(url)
            .query(query)
            .header("X-Rundeck-Auth-Token", &self.token)
            .header("Accept", "application/xml")
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;

        if self.debug {
            tracing::debug!(status, body = %body, "rundeck response");
        }
        Ok(RawResponse { status, body })
    }
}

/// Which slice of an execution log to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputWindow {
    /// The most recent `n` lines, oldest first.
    LastLines(usize),
    /// Up to `max_lines` lines starting at byte `offset`.
    Offset { offset: u64, max_lines: usize },
}

/// Lines requested per page when following a whole log.
const FULL_LOG_PAGE_LINES: usize = 500;

/// Upper bound on pages read for one full log.
const FULL_LOG_MAX_PAGES: usize = 200;

pub struct RundeckClient<T> {
    transport: T,
    api_version: u32,
}

impl<T: Transport> RundeckClient<T> {
    pub fn new(transport: T, api_version: u32) -> Self {
        Self {
            transport,
            api_version,
        }
    }

    pub async fn get_info(&self) -> Outcome<SystemInfo> {
        self.fetch("system/info", &[]).await
    }

    pub async fn list_projects(&self) -> Outcome<Vec<Project>> {
        self.fetch("projects", &[]).await
    }

    pub async fn list_jobs(&self, project: &str) -> Outcome<Vec<Job>> {
        self.fetch("jobs", &[("project", project.to_string())]).await
    }

    pub async fn list_executions(
        &self,
        project: &str,
        limit: Option<usize>,
    ) -> Outcome<Vec<ExecutionHandle>> {
        let mut query = vec![("project", project.to_string())];
        if let Some(max) = limit {
            query.push(("max", max.to_string()));
        }
        self.fetch("executions", &query).await
    }

    pub async fn list_running(&self, project: &str) -> Outcome<Vec<ExecutionHandle>> {
        self.fetch("executions/running", &[("project", project.to_string())])
            .await
    }

    /// Job definition, including its option declarations.
    pub async fn get_definition(&self, job_id: &str) -> Outcome<JobDefinition> {
        self.fetch(&format!("job/{job_id}"), &[]).await
    }

    /// Start a job now. The acknowledgment is the new execution.
    pub async fn submit_run(
        &self,
        job_id: &str,
        options: &JobOptions,
        as_user: Option<&str>,
    ) -> Outcome<ExecutionHandle> {
        let mut query = Vec::new();
        if !options.is_empty() {
            query.push(("argString", arg_string(options)));
        }
        if let Some(user) = as_user {
            query.push(("asUser", user.to_string()));
        }
        self.fetch::<Vec<ExecutionHandle>>(&format!("job/{job_id}/run"), &query)
            .await
            .and_then(first_execution)
    }

    pub async fn get_execution(&self, id: u64) -> Outcome<ExecutionHandle> {
        self.fetch::<Vec<ExecutionHandle>>(&format!("execution/{id}"), &[])
            .await
            .and_then(first_execution)
    }

    pub async fn get_output(&self, id: u64, window: OutputWindow) -> Outcome<OutputPage> {
        let query = match window {
            OutputWindow::LastLines(n) => vec![("lastlines", n.to_string())],
            OutputWindow::Offset { offset, max_lines } => vec![
                ("offset", offset.to_string()),
                ("maxlines", max_lines.to_string()),
            ],
        };
        self.fetch(&format!("execution/{id}/output"), &query).await
    }

    /// Read a whole log by following offsets until the server reports it
    /// complete. Entries are concatenated in order.
    pub async fn fetch_full_output(&self, id: u64) -> Outcome<OutputPage> {
        let mut offset = 0;
        let mut collected = Vec::new();

        for _ in 0..FULL_LOG_MAX_PAGES {
            let window = OutputWindow::Offset {
                offset,
                max_lines: FULL_LOG_PAGE_LINES,
            };
            let mut page = match self.get_output(id, window).await {
                Outcome::Success(page) => page,
                other => return other,
            };
            collected.append(&mut page.lines);

            let stalled = page.offset <= offset;
            if page.log_complete || stalled {
                page.lines = collected;
                return Outcome::Success(page);
            }
            offset = page.offset;
        }
        Outcome::Failure(format!("output of execution {id} did not finish loading"))
    }

    /// Resolve a job name to its id: the project must exist and contain a job
    /// with exactly that name. `Success(None)` means it does not.
    pub async fn find_job(&self, reference: &JobReference) -> Outcome<Option<Job>> {
        let projects = match self.list_projects().await {
            Outcome::Success(p) => p,
            other => return other.map(|_| None),
        };
        if !projects.iter().any(|p| p.name == reference.project) {
            return Outcome::Success(None);
        }
        self.list_jobs(&reference.project)
            .await
            .map(|jobs| jobs.into_iter().find(|j| j.name == reference.job))
    }

    async fn fetch<P: Payload>(&self, endpoint: &str, query: &[(&str, String)]) -> Outcome<P> {
        let path = format!("api/{}/{}", self.api_version, endpoint);
        let query: Vec<(String, String)> = query
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();

        match self.transport.get(&path, &query).await {
            Ok(raw) => {
                let outcome = classify(&raw.body, raw.status);
                tracing::debug!(path = %path, status = raw.status, outcome = outcome.kind(), "classified");
                if let Outcome::Unparseable(reason) = &outcome {
                    tracing::error!(path = %path, %reason, "unparseable rundeck response");
                }
                outcome
            }
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "rundeck transport failure");
                Outcome::Failure(e.to_string())
            }
        }
    }
}

fn first_execution(execs: Vec<ExecutionHandle>) -> Outcome<ExecutionHandle> {
    execs
        .into_iter()
        .next()
        .map_or_else(|| Outcome::NotFound("no execution in response".into()), Outcome::Success)
}

/// `-NAME value` pairs as Rundeck's argString expects.
pub fn arg_string(options: &JobOptions) -> String {
    options
        .iter()
        .map(|(k, v)| {
            if v.contains(char::is_whitespace) {
                format!("-{k} \"{v}\"")
            } else {
                format!("-{k} {v}")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
