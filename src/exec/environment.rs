// src/exec/environment.rs

//! Child process environment as an ordered list of `KEY=VALUE` entries.
//!
//! Lookup is first-match: when an extension is prepended, its entries shadow
//! identical keys further down the list without removing them.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    entries: Vec<String>,
}

impl Environment {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// The built-in default: a single `HOME` entry pointing at the temp dir.
    ///
    /// Callers needing `PATH`, locale or anything else must pass a richer
    /// environment (or set `[config].default_env`).
    pub fn minimal() -> Self {
        let home = std::env::temp_dir();
        Self::new([format!("HOME={}", home.display())])
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value of the first entry for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .filter_map(|e| split_entry(e))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    /// `extension` first, then `self`.
    pub fn prepended(&self, extension: &Environment) -> Environment {
        let mut entries = extension.entries.clone();
        entries.extend(self.entries.iter().cloned());
        Environment { entries }
    }

    /// Pairs as the child will see them: shadowed duplicates removed,
    /// malformed entries (no `=`) skipped.
    pub fn effective_pairs(&self) -> Vec<(String, String)> {
        let mut seen = std::collections::HashSet::new();
        let mut pairs = Vec::new();
        for (k, v) in self.entries.iter().filter_map(|e| split_entry(e)) {
            if seen.insert(k) {
                pairs.push((k.to_string(), v.to_string()));
            }
        }
        pairs
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::minimal()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.entries)
    }
}

/// Check that an entry has the `KEY=VALUE` shape with a non-empty key.
pub fn validate_entry(entry: &str) -> Result<(), String> {
    match split_entry(entry) {
        Some(_) => Ok(()),
        None => Err(format!("environment entry '{entry}' is not of the form KEY=VALUE")),
    }
}

fn split_entry(entry: &str) -> Option<(&str, &str)> {
    match entry.split_once('=') {
        Some((k, v)) if !k.is_empty() => Some((k, v)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepend_shadows_without_removing() {
        let base = Environment::new(["A=1", "B=2"]);
        let ext = Environment::new(["A=2"]);
        let env = base.prepended(&ext);

        assert_eq!(env.get("A"), Some("2"));
        assert_eq!(env.entries(), &["A=2", "A=1", "B=2"]);
        assert_eq!(base.get("A"), Some("1"));
    }

    #[test]
    fn effective_pairs_drop_shadowed_and_malformed() {
        let env = Environment::new(["A=2", "junk", "A=1", "=x", "C="]);
        assert_eq!(
            env.effective_pairs(),
            vec![
                ("A".to_string(), "2".to_string()),
                ("C".to_string(), String::new())
            ]
        );
    }

    #[test]
    fn minimal_has_only_home() {
        let env = Environment::minimal();
        assert_eq!(env.entries().len(), 1);
        assert!(env.get("HOME").is_some());
    }

    #[test]
    fn value_may_contain_equals() {
        let env = Environment::new(["OPTS=a=b"]);
        assert_eq!(env.get("OPTS"), Some("a=b"));
        assert!(validate_entry("OPTS=a=b").is_ok());
        assert!(validate_entry("OPTS").is_err());
    }
}
