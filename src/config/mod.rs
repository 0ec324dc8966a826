// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - `model.rs` defines the raw TOML model and the checked model.
//! - `loader.rs` reads a file from disk.
//! - `validate.rs` turns the raw model into a `ConfigFile`.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_with};
pub use model::{
    ConfigFile, ConfigSection, InvocationConfig, RawConfigFile, RawInvocationConfig,
    RemoteSection, Settings, TranslationConfig,
};
