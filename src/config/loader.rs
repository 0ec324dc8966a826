// src/config/loader.rs

use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};

/// Load a configuration file and return the raw, unchecked model.
///
/// Only TOML deserialization happens here. Use [`load_and_validate`] for the
/// checked [`ConfigFile`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    load_with(&RealFileSystem, path.as_ref())
}

/// Same as [`load_from_path`], reading through the given filesystem.
pub fn load_with(fs: &dyn FileSystem, path: &Path) -> Result<RawConfigFile> {
    let contents = fs.read_to_string(path)?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Load and validate: parse exit-code keys, environment entries, output
/// modes and recovery settings.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// `Execward.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Execward.toml")
}
