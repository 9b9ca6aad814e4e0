//! Method-to-roles access table.

use std::collections::{HashMap, HashSet};

use crate::rpc::methods;

/// Which roles may invoke which methods.
///
/// Methods without a rule are public. Built once at startup and never
/// mutated while serving.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    rules: HashMap<String, HashSet<String>>,
}

impl AccessPolicy {
    /// An empty policy: every method is public.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the rule for `method`.
    #[must_use]
    pub fn with_rule<I, S>(mut self, method: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules
            .insert(method.into(), roles.into_iter().map(Into::into).collect());
        self
    }

    /// Roles allowed to call `method`, or `None` for a public method.
    pub fn roles_for(&self, method: &str) -> Option<&HashSet<String>> {
        self.rules.get(method)
    }

    pub fn is_public(&self, method: &str) -> bool {
        !self.rules.contains_key(method)
    }

    pub fn rules(&self) -> impl Iterator<Item = (&str, &HashSet<String>)> {
        self.rules.iter().map(|(m, r)| (m.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<(String, HashSet<String>)> for AccessPolicy {
    fn from_iter<T: IntoIterator<Item = (String, HashSet<String>)>>(iter: T) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

/// Default rules: admins create and upload, admins and users rate.
pub fn default_access_policy() -> AccessPolicy {
    AccessPolicy::new()
        .with_rule(methods::CREATE_LAPTOP, ["admin"])
        .with_rule(methods::UPLOAD_IMAGE, ["admin"])
        .with_rule(methods::RATE_LAPTOP, ["admin", "user"])
}
