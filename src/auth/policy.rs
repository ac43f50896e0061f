//! Route Access Policy
//! Mission: Decide which canonical paths are protected and by which minimum role
//!
//! Matching rule: the request path is first canonicalized (see
//! [`canonicalize_path`]); the gate then rewrites the request to that
//! canonical path so routing sees exactly what was judged. A path is governed
//! by the longest rule prefix that matches it on a segment boundary.

use crate::auth::models::{ParseRoleError, Role};
use std::str::FromStr;

/// Normalize a URI path: collapse `//`, drop `.`, resolve `..` (clamped at
/// root) and strip any trailing `/`. Percent-escapes are left untouched.
pub fn canonicalize_path(raw: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    let mut path = String::with_capacity(raw.len());
    for segment in segments {
        path.push('/');
        path.push_str(segment);
    }
    path
}

/// `prefix` governs `path` when equal or when `path` continues past it with `/`
fn governs(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// A protected path prefix with the minimum role it requires
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedPrefix {
    pub prefix: String,
    pub min_role: Role,
}

impl ProtectedPrefix {
    pub fn new(prefix: &str, min_role: Role) -> Self {
        Self {
            prefix: canonicalize_path(prefix),
            min_role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParsePrefixError {
    #[error("protected prefix must start with '/': {0}")]
    NotAbsolute(String),
    #[error(transparent)]
    Role(#[from] ParseRoleError),
}

/// Parses `PREFIX` or `PREFIX=ROLE`; a bare prefix requires `USER`
impl FromStr for ProtectedPrefix {
    type Err = ParsePrefixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, role) = match s.split_once('=') {
            Some((prefix, role)) => (prefix.trim(), role.parse::<Role>()?),
            None => (s.trim(), Role::User),
        };
        if !prefix.starts_with('/') {
            return Err(ParsePrefixError::NotAbsolute(prefix.to_string()));
        }
        Ok(Self::new(prefix, role))
    }
}

#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    rules: Vec<ProtectedPrefix>,
}

impl AccessPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require at least `min_role` for everything under `prefix`.
    /// Re-declaring a prefix replaces its role.
    pub fn protect(mut self, prefix: &str, min_role: Role) -> Self {
        self.insert(ProtectedPrefix::new(prefix, min_role));
        self
    }

    fn insert(&mut self, rule: ProtectedPrefix) {
        self.rules.retain(|r| r.prefix != rule.prefix);
        self.rules.push(rule);
        // Longest prefix first so the first hit is the most specific rule
        self.rules.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
    }

    /// Minimum role for an already canonical path, `None` when unprotected
    pub fn required_role(&self, canonical_path: &str) -> Option<Role> {
        self.rules
            .iter()
            .find(|rule| governs(&rule.prefix, canonical_path))
            .map(|rule| rule.min_role)
    }

    pub fn rules(&self) -> &[ProtectedPrefix] {
        &self.rules
    }
}

impl FromIterator<ProtectedPrefix> for AccessPolicy {
    fn from_iter<I: IntoIterator<Item = ProtectedPrefix>>(iter: I) -> Self {
        let mut policy = AccessPolicy::new();
        for rule in iter {
            policy.insert(rule);
        }
        policy
    }
}
