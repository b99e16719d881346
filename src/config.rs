//! Runtime configuration.
//!
//! Priority order (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (RUNDECK_URL, RUNDECK_TOKEN, RUNDECK_API_DEBUG)
//! 3. YAML configuration file
//! 4. Defaults

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::auth::StaticAuthorizer;
use crate::orchestrator::PollSettings;
use crate::rundeck::{DEFAULT_API_VERSION, ServerSpec, parse_server};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Base URL of the Rundeck server.
    #[serde(default)]
    pub url: String,

    /// Static API token sent with every request.
    #[serde(default)]
    pub token: String,

    /// Log every request and response body at debug level.
    #[serde(default)]
    pub api_debug: bool,

    #[serde(default = "default_api_version")]
    pub api_version: u32,

    /// Group whose members may run jobs.
    #[serde(default = "default_group")]
    pub group: String,

    /// Bot name quoted in the info reply.
    #[serde(default = "default_robot_name")]
    pub robot_name: String,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default)]
    pub progress_threshold_secs: u64,

    /// Stop polling after this long. Unset polls until the execution ends.
    #[serde(default)]
    pub poll_timeout_secs: Option<u64>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Group name -> member display names.
    #[serde(default)]
    pub users: BTreeMap<String, Vec<String>>,
}

fn default_api_version() -> u32 {
    DEFAULT_API_VERSION
}

fn default_group() -> String {
    "rundeck_users".to_string()
}

fn default_robot_name() -> String {
    "lita".to_string()
}

fn default_poll_interval() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: String::new(),
            api_debug: false,
            api_version: default_api_version(),
            group: default_group(),
            robot_name: default_robot_name(),
            poll_interval_secs: default_poll_interval(),
            progress_threshold_secs: 0,
            poll_timeout_secs: None,
            request_timeout_secs: default_request_timeout(),
            users: BTreeMap::new(),
        }
    }
}

/// Values given on the command line; `None` leaves lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub url: Option<String>,
    pub token: Option<String>,
}

impl Config {
    /// Read a YAML file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Full load: optional file, then environment, then CLI overrides.
    pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        cfg.apply_env(|key| std::env::var(key).ok());
        cfg.apply_overrides(overrides);
        tracing::debug!(url = %cfg.url, api_version = cfg.api_version, "configuration loaded");
        Ok(cfg)
    }

    /// Apply environment values through `lookup` (injectable for tests).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty("RUNDECK_URL") {
            self.url = url;
        }
        if let Some(token) = non_empty("RUNDECK_TOKEN") {
            self.token = token;
        }
        if let Some(flag) = non_empty("RUNDECK_API_DEBUG") {
            self.api_debug = matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(url) = &overrides.url {
            self.url = url.clone();
        }
        if let Some(token) = &overrides.token {
            self.token = token.clone();
        }
    }

    /// Check required settings and return the parsed server location.
    pub fn validate(&self) -> Result<ServerSpec> {
        if self.url.trim().is_empty() {
            bail!("No Rundeck URL configured (set `url`, RUNDECK_URL or --url)");
        }
        if self.token.trim().is_empty() {
            bail!("No API token configured (set `token`, RUNDECK_TOKEN or --token)");
        }
        if self.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be at least 1");
        }
        parse_server(&self.url, self.api_version)
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.poll_interval_secs),
            progress_threshold: Duration::from_secs(self.progress_threshold_secs),
            timeout: self.poll_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn authorizer(&self) -> StaticAuthorizer {
        StaticAuthorizer::new(self.users.clone())
    }
}
