//! In-memory alias registry.
//!
//! Maps a human-friendly name onto a (project, job) pair plus default job
//! options. Names are unique and case-sensitive; aliases are immutable once
//! registered and live for the lifetime of the process.

use std::collections::BTreeMap;

use crate::error::AliasError;

/// Job options as `NAME -> value`.
pub type JobOptions = BTreeMap<String, String>;

/// A (project, job) pair, resolved from explicit flags or from an alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReference {
    pub project: String,
    pub job: String,
}

impl JobReference {
    pub fn new(project: impl Into<String>, job: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            job: job.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub name: String,
    pub project: String,
    pub job: String,
    pub default_options: JobOptions,
}

impl Alias {
    pub fn job_reference(&self) -> JobReference {
        JobReference::new(&self.project, &self.job)
    }
}

/// Registry of aliases, kept in insertion order.
#[derive(Debug, Default)]
pub struct AliasRegistry {
    aliases: Vec<Alias>,
}

impl AliasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new alias. Existing names are never overwritten.
    pub fn register(
        &mut self,
        name: &str,
        project: Option<&str>,
        job: Option<&str>,
        options: JobOptions,
    ) -> Result<(), AliasError> {
        let name = name.trim();
        let project = project.map(str::trim).unwrap_or_default();
        let job = job.map(str::trim).unwrap_or_default();
        if name.is_empty() || project.is_empty() || job.is_empty() {
            return Err(AliasError::BadFormat);
        }
        if self.position(name).is_some() {
            return Err(AliasError::AlreadyExists(name.to_string()));
        }

        tracing::debug!(alias = name, project, job, "alias registered");
        self.aliases.push(Alias {
            name: name.to_string(),
            project: project.to_string(),
            job: job.to_string(),
            default_options: options,
        });
        Ok(())
    }

    pub fn forget(&mut self, name: &str) -> Result<Alias, AliasError> {
        let idx = self
            .position(name)
            .ok_or_else(|| AliasError::NotFound(name.to_string()))?;
        tracing::debug!(alias = name, "alias removed");
        Ok(self.aliases.remove(idx))
    }

    pub fn lookup(&self, name: &str) -> Result<&Alias, AliasError> {
        self.position(name)
            .map(|idx| &self.aliases[idx])
            .ok_or_else(|| AliasError::NotFound(name.to_string()))
    }

    /// Iterate aliases in registration order. Each call starts over.
    pub fn list(&self) -> impl Iterator<Item = &Alias> {
        self.aliases.iter()
    }

    /// First alias pointing at the given project and job, if any.
    pub fn alias_for(&self, project: &str, job: &str) -> Option<&Alias> {
        self.aliases
            .iter()
            .find(|a| a.project == project && a.job == job)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.aliases.iter().position(|a| a.name == name)
    }
}
