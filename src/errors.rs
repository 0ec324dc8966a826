// src/errors.rs

//! Crate-wide error type and `Result` alias.
//!
//! "Executable not found" is deliberately absent: the registry reports it as
//! a [`Resolution::NotFound`](crate::registry::Resolution) value that callers
//! may ignore. Only an explicit `require` turns it into
//! [`ExecError::RequiredExecutableNotFound`].

use thiserror::Error;

use crate::exec::outcome::{Failure, TranslatedFailure};
use crate::registry::NotFound;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Raised synchronously, before anything is spawned.
    #[error("Invalid output sink: {0}")]
    InvalidOutputSink(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Required executable not found: {0}")]
    RequiredExecutableNotFound(NotFound),

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Exit code had neither a success entry nor a translation.
    #[error(transparent)]
    ExecutionFailed(Failure),

    /// Exit code matched a caller-declared translation.
    #[error(transparent)]
    Translated(TranslatedFailure),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ExecError {
    /// The failing invocation, for generic and translated failures.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            ExecError::ExecutionFailed(f) => Some(f),
            ExecError::Translated(t) => Some(&t.failure),
            _ => None,
        }
    }

    /// True for the two kinds the recovery frontend may resolve.
    pub fn is_execution_failure(&self) -> bool {
        self.failure().is_some()
    }

    /// Kind name of a translated failure.
    pub fn translated_kind(&self) -> Option<&str> {
        match self {
            ExecError::Translated(t) => Some(t.kind.as_str()),
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ExecError>;
