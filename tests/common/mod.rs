#![allow(dead_code)]

pub use execward_test_utils::builders;
pub use execward_test_utils::{init_tracing, Harness, ScriptedRun, SharedBuffer, SpySpawner};

use std::path::{Path, PathBuf};

/// Write an executable shell script `name` into `dir`.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// Environment entry the dispatcher uses when nothing else is configured.
pub fn default_home_entry() -> (String, String) {
    ("HOME".to_string(), std::env::temp_dir().display().to_string())
}
