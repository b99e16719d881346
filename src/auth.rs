//! Authorization capability.
//!
//! The chat host owns group membership; this crate only asks two questions
//! of it. `StaticAuthorizer` answers them from the configuration file.

use std::collections::BTreeMap;

pub trait Authorizer: Send + Sync {
    /// Is `user` a member of `group`?
    fn user_in_group(&self, user: &str, group: &str) -> bool;

    /// Display names of every member of `group`, in a stable order.
    fn users_in_group(&self, group: &str) -> Vec<String>;
}

/// Group membership loaded once at start-up.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthorizer {
    groups: BTreeMap<String, Vec<String>>,
}

impl StaticAuthorizer {
    pub fn new(groups: BTreeMap<String, Vec<String>>) -> Self {
        Self { groups }
    }
}

impl Authorizer for StaticAuthorizer {
    fn user_in_group(&self, user: &str, group: &str) -> bool {
        self.groups
            .get(group)
            .is_some_and(|members| members.iter().any(|m| m == user))
    }

    fn users_in_group(&self, group: &str) -> Vec<String> {
        self.groups.get(group).cloned().unwrap_or_default()
    }
}
