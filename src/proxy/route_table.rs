//! Prefix-based route lookup.
//!
//! # Design Decisions
//! - Entries are immutable and the table is never mutated after construction,
//!   so lookups need no locking
//! - Literal prefix match only, no globbing
//! - First registered entry wins, no longest-prefix preference
//! - Explicit [`ProxyError::RouteNotFound`] rather than a silent default

use crate::proxy::types::*;

/// Association between a path prefix and a backend base URL
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteEntry {
    prefix: RoutePrefix,
    target: TargetUrl,
}

impl RouteEntry {
    pub fn new(prefix: RoutePrefix, target: TargetUrl) -> Self {
        Self { prefix, target }
    }

    pub fn prefix(&self) -> &RoutePrefix {
        &self.prefix
    }

    pub fn target(&self) -> &TargetUrl {
        &self.target
    }

    /// True when the prefix is a literal prefix of `path`
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(self.prefix.as_ref())
    }
}

/// Ordered, read-only routing table
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    /// Build a table; registration order is the order of `entries`
    pub fn new(entries: Vec<RouteEntry>) -> Self {
        Self { entries }
    }

    /// Find the first entry whose prefix starts `path`
    pub fn resolve(&self, path: &str) -> ProxyResult<&RouteEntry> {
        self.entries
            .iter()
            .find(|entry| entry.matches(path))
            .ok_or_else(|| ProxyError::RouteNotFound {
                path: path.to_string(),
            })
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<RouteEntry> for RouteTable {
    fn from_iter<I: IntoIterator<Item = RouteEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
