// src/registry/mod.rs

//! Executable registry: symbolic program name -> filesystem path.
//!
//! `resolve` scans the search path in order and tests `dir/name` plus the
//! platform executable suffix. The first hit is cached process-wide (per
//! registry instance) and returned without re-scanning on later calls.
//!
//! A miss is not an error. It is returned as [`Resolution::NotFound`] and
//! logged at `warn`; callers that cannot proceed without the program use
//! [`Resolution::require`] or [`ExecutableRegistry::require`].

pub mod cache;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use tracing::{debug, warn};

use crate::errors::{ExecError, Result};
use crate::fs::{FileSystem, RealFileSystem};

pub use cache::ResolutionCache;

/// Directories scanned when neither the caller nor the config supplies any.
pub const DEFAULT_SEARCH_PATHS: &[&str] = &["/usr/bin", "/bin"];

/// Appended to the name when probing (`.exe` on Windows, empty elsewhere).
pub const EXECUTABLE_SUFFIX: &str = std::env::consts::EXE_SUFFIX;

pub fn default_search_paths() -> Vec<PathBuf> {
    DEFAULT_SEARCH_PATHS.iter().map(PathBuf::from).collect()
}

/// A name that could not be found on the given search path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFound {
    pub name: String,
    pub search_paths: Vec<PathBuf>,
}

impl fmt::Display for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dirs: Vec<String> = self
            .search_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        write!(f, "'{}' (searched: {})", self.name, dirs.join(", "))
    }
}

/// Result of a registry lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(PathBuf),
    NotFound(NotFound),
}

impl Resolution {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Resolution::Found(p) => Some(p),
            Resolution::NotFound(_) => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }

    /// Upgrade a miss into a fatal error.
    pub fn require(self) -> Result<PathBuf> {
        match self {
            Resolution::Found(p) => Ok(p),
            Resolution::NotFound(nf) => Err(ExecError::RequiredExecutableNotFound(nf)),
        }
    }
}

#[derive(Debug)]
pub struct ExecutableRegistry {
    fs: Arc<dyn FileSystem>,
    cache: Mutex<ResolutionCache>,
}

impl ExecutableRegistry {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            cache: Mutex::new(ResolutionCache::new()),
        }
    }

    /// Shared registry backed by the real filesystem.
    pub fn global() -> Arc<ExecutableRegistry> {
        static GLOBAL: OnceLock<Arc<ExecutableRegistry>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Arc::new(ExecutableRegistry::new(Arc::new(RealFileSystem))))
            .clone()
    }

    pub fn resolve(&self, name: &str, search_paths: &[PathBuf]) -> Resolution {
        if let Some(path) = self.cache().get(name) {
            debug!(name, path = %path.display(), "executable cache hit");
            return Resolution::Found(path.to_path_buf());
        }

        let file_name = format!("{name}{EXECUTABLE_SUFFIX}");
        for dir in search_paths {
            let candidate = dir.join(&file_name);
            if self.fs.exists(&candidate) {
                self.cache().insert(name, candidate.clone());
                return Resolution::Found(candidate);
            }
        }

        let not_found = NotFound {
            name: name.to_string(),
            search_paths: search_paths.to_vec(),
        };
        warn!(executable = %not_found, "executable not found");
        Resolution::NotFound(not_found)
    }

    pub fn require(&self, name: &str, search_paths: &[PathBuf]) -> Result<PathBuf> {
        self.resolve(name, search_paths).require()
    }

    pub fn cached(&self, name: &str) -> Option<PathBuf> {
        self.cache().get(name).map(Path::to_path_buf)
    }

    pub fn invalidate(&self, name: &str) {
        self.cache().invalidate(name);
    }

    /// Forget every cached resolution.
    pub fn reset(&self) {
        self.cache().clear();
    }

    fn cache(&self) -> MutexGuard<'_, ResolutionCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn registry_with(files: &[&str]) -> (ExecutableRegistry, MockFileSystem) {
        let fs = MockFileSystem::new();
        for f in files {
            fs.add_file(f, b"#!/bin/sh\n".to_vec());
        }
        (ExecutableRegistry::new(Arc::new(fs.clone())), fs)
    }

    fn paths(dirs: &[&str]) -> Vec<PathBuf> {
        dirs.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn first_matching_directory_wins() {
        let (reg, _) = registry_with(&["/usr/bin/tool", "/bin/tool"]);
        let res = reg.resolve("tool", &paths(&["/usr/bin", "/bin"]));
        assert_eq!(res, Resolution::Found(PathBuf::from("/usr/bin/tool")));
    }

    #[test]
    fn cache_hit_skips_scanning() {
        let (reg, fs) = registry_with(&["/bin/tool"]);
        reg.resolve("tool", &paths(&["/bin"]));
        let probes_before = fs.probes().len();

        let res = reg.resolve("tool", &[]);
        assert_eq!(res.path(), Some(Path::new("/bin/tool")));
        assert_eq!(fs.probes().len(), probes_before);
    }

    #[test]
    fn invalidate_forces_rescan() {
        let (reg, fs) = registry_with(&["/bin/tool"]);
        reg.resolve("tool", &paths(&["/bin"]));
        fs.remove("/bin/tool");
        reg.invalidate("tool");

        assert!(!reg.resolve("tool", &paths(&["/bin"])).is_found());
    }

    #[test]
    fn miss_is_a_value_not_an_error() {
        let (reg, _) = registry_with(&[]);
        match reg.resolve("ghost", &paths(&["/bin"])) {
            Resolution::NotFound(nf) => {
                assert_eq!(nf.name, "ghost");
                assert_eq!(nf.search_paths, paths(&["/bin"]));
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
        assert!(reg.cached("ghost").is_none());
    }

    #[test]
    fn require_upgrades_miss() {
        let (reg, _) = registry_with(&[]);
        let err = reg.require("ghost", &paths(&["/bin"])).unwrap_err();
        assert!(matches!(err, ExecError::RequiredExecutableNotFound(ref nf) if nf.name == "ghost"));
    }
}
