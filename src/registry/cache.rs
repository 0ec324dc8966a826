// src/registry/cache.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Resolved executable paths keyed by symbolic name.
///
/// The key is the name alone: a later lookup with a different search path
/// still returns the first resolution until the entry is invalidated.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    paths: HashMap<String, PathBuf>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self {
            paths: HashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.paths.get(name).map(PathBuf::as_path)
    }

    pub fn insert(&mut self, name: &str, path: PathBuf) {
        debug!(name, path = %path.display(), "caching executable resolution");
        self.paths.insert(name.to_string(), path);
    }

    /// Drop the cached path for one name.
    pub fn invalidate(&mut self, name: &str) {
        if self.paths.remove(name).is_some() {
            debug!(name, "invalidated cached executable");
        }
    }

    pub fn clear(&mut self) {
        debug!(entries = self.paths.len(), "clearing executable cache");
        self.paths.clear();
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_and_clear_empties() {
        let mut cache = ResolutionCache::new();
        cache.insert("ls", PathBuf::from("/bin/ls"));
        cache.insert("ls", PathBuf::from("/usr/bin/ls"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("ls"), Some(Path::new("/usr/bin/ls")));

        cache.invalidate("missing");
        cache.clear();
        assert!(cache.is_empty());
    }
}
