//! Rundeck server access.
//!
//! parse_server -> ServerSpec (validated base URL + API version)
//! client       -> RundeckClient over a Transport (reqwest in production)
//! classify     -> raw XML -> Outcome
//! model        -> typed documents
//!
use anyhow::{Result, bail};
use std::fmt;
use url::Url;

pub mod classify;
pub mod client;
pub mod model;

pub use classify::Outcome;
pub use client::{HttpTransport, OutputWindow, RundeckClient, Transport};

/// API version the handler was written against.
pub const DEFAULT_API_VERSION: u32 = 10;

/// A validated Rundeck server location.
///
/// The base URL always ends with `/` so relative API paths join onto it
/// instead of replacing its last segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSpec {
    original: String,
    base: Url,
    api_version: u32,
}

impl ServerSpec {
    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn api_version(&self) -> u32 {
        self.api_version
    }

    /// Public URL of a project, as shown in the `projects` listing.
    pub fn project_url(&self, project: &str) -> String {
        format!(
            "{}/api/{}/project/{}",
            self.original.trim_end_matches('/'),
            self.api_version,
            project
        )
    }
}

impl fmt::Display for ServerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (api {})", self.base, self.api_version)
    }
}

/// Parse a `url` setting into a `ServerSpec`.
///
/// Only http and https are accepted; anything else is a configuration error.
///
/// Examples:
/// - "https://rundeck.mycompany.org"        -> base "https://rundeck.mycompany.org/"
/// - "https://ops.example/rundeck/"         -> base "https://ops.example/rundeck/"
pub fn parse_server(raw: &str, api_version: u32) -> Result<ServerSpec> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("Rundeck URL is empty");
    }

    let mut base = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(e) => bail!("Rundeck URL '{trimmed}' is not a valid URL: {e}"),
    };
    match base.scheme() {
        "http" | "https" => {}
        other => bail!("Rundeck URL must be http or https, got '{other}'"),
    }
    if base.cannot_be_a_base() {
        bail!("Rundeck URL '{trimmed}' cannot carry API paths");
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    if api_version == 0 {
        bail!("API version must be positive");
    }

    Ok(ServerSpec {
        original: trimmed.to_string(),
        base,
        api_version,
    })
}
