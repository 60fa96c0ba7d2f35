//! Pattern table and lookup.
//!
//! # Responsibilities
//! - Store one entry per registered pattern
//! - Look up the most specific pattern matching a request
//! - Return an explicit no-match
//!
//! # Design Decisions
//! - Written during setup, read concurrently while serving (RwLock)
//! - O(n) scan over patterns; route counts are small

use std::sync::{PoisonError, RwLock};

use super::matcher::{Pattern, PatternError};

/// Registered patterns mapped to their handlers.
#[derive(Debug)]
pub struct RouteTable<T> {
    entries: RwLock<Vec<(Pattern, T)>>,
}

impl<T: Clone> RouteTable<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Entry for `pattern`, created by `make` on first use.
    pub fn get_or_insert_with<F>(&self, pattern: &str, make: F) -> Result<T, PatternError>
    where
        F: FnOnce(&Pattern) -> T,
    {
        let pattern = Pattern::parse(pattern)?;
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some((_, value)) = entries.iter().find(|(p, _)| *p == pattern) {
            return Ok(value.clone());
        }
        let value = make(&pattern);
        entries.push((pattern, value.clone()));
        Ok(value)
    }

    /// Most specific entry matching `host` and `path`.
    pub fn lookup(&self, host: Option<&str>, path: &str) -> Option<T> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .filter(|(pattern, _)| pattern.matches(host, path))
            .max_by_key(|(pattern, _)| pattern.specificity())
            .map(|(_, value)| value.clone())
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl<T: Clone> Default for RouteTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable<&'static str> {
        let table = RouteTable::new();
        for (pattern, name) in [
            ("/", "root"),
            ("/ping", "ping"),
            ("/files/", "files"),
            ("/files/special", "special"),
            ("admin.local/", "admin"),
        ] {
            table.get_or_insert_with(pattern, |_| name).unwrap();
        }
        table
    }

    #[test]
    fn test_lookup_prefers_most_specific() {
        let table = table();
        assert_eq!(table.lookup(None, "/ping"), Some("ping"));
        assert_eq!(table.lookup(None, "/ping/more"), Some("root"));
        assert_eq!(table.lookup(None, "/files/a"), Some("files"));
        assert_eq!(table.lookup(None, "/files/special"), Some("special"));
        assert_eq!(table.lookup(Some("admin.local"), "/ping"), Some("admin"));
    }

    #[test]
    fn test_no_match() {
        let table = RouteTable::new();
        table.get_or_insert_with("/ping", |_| 1).unwrap();
        assert_eq!(table.lookup(None, "/pong"), None);
    }

    #[test]
    fn test_get_or_insert_is_idempotent() {
        let table = RouteTable::new();
        let first = table.get_or_insert_with("/ping", |_| 1).unwrap();
        let second = table.get_or_insert_with("/ping", |_| 2).unwrap();
        assert_eq!((first, second), (1, 1));
        assert_eq!(table.len(), 1);
    }
}
