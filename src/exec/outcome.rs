// src/exec/outcome.rs

//! Typed results of an invocation and the exit-code mapping that produces
//! them.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use crate::errors::{ExecError, Result};
use crate::exec::tables::{ErrorTranslationTable, ExitCodeTable};

/// Value attached to a valid exit code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Bool(bool),
    Int(i64),
    Token(String),
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Bool(b) => write!(f, "{b}"),
            Payload::Int(i) => write!(f, "{i}"),
            Payload::Token(t) => f.write_str(t),
        }
    }
}

impl From<bool> for Payload {
    fn from(b: bool) -> Self {
        Payload::Bool(b)
    }
}

impl From<i64> for Payload {
    fn from(i: i64) -> Self {
        Payload::Int(i)
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Token(s.to_string())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Token(s)
    }
}

/// Captured stdout, kept byte for byte as the child wrote it.
///
/// Text accessors are layered on top; none of them rewrites the bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputBytes(Vec<u8>);

impl OutputBytes {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The output as text; `None` when it is not valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// Decode as UTF-8, failing with `InvalidData` instead of substituting.
    pub fn to_text(&self) -> std::io::Result<&str> {
        std::str::from_utf8(&self.0)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Lossy rendering for humans (logs, prompts).
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    pub(crate) fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.0.extend_from_slice(bytes);
    }
}

impl From<Vec<u8>> for OutputBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for OutputBytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<String> for OutputBytes {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<&str> for OutputBytes {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl PartialEq<str> for OutputBytes {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl PartialEq<&str> for OutputBytes {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl PartialEq<[u8]> for OutputBytes {
    fn eq(&self, other: &[u8]) -> bool {
        self.0 == other
    }
}

impl fmt::Display for OutputBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

/// Captured stdout on the failure path, or a marker that it was not captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapturedOutput {
    Captured(OutputBytes),
    NotCaptured,
}

impl CapturedOutput {
    pub fn bytes(&self) -> Option<&OutputBytes> {
        match self {
            CapturedOutput::Captured(b) => Some(b),
            CapturedOutput::NotCaptured => None,
        }
    }

    /// Captured text; `None` when not captured or not valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        self.bytes().and_then(OutputBytes::as_str)
    }
}

impl From<Option<OutputBytes>> for CapturedOutput {
    fn from(output: Option<OutputBytes>) -> Self {
        match output {
            Some(b) => CapturedOutput::Captured(b),
            None => CapturedOutput::NotCaptured,
        }
    }
}

impl fmt::Display for CapturedOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapturedOutput::Captured(b) => write!(f, "{b}"),
            CapturedOutput::NotCaptured => f.write_str("<not captured>"),
        }
    }
}

/// A completed invocation whose exit code was in the valid table.
///
/// `output` is `Some` only when stdout was in capture mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Success {
    pub payload: Payload,
    pub output: Option<OutputBytes>,
    pub exit_code: i32,
}

/// Everything needed to reproduce a failing invocation without re-running it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} {:?} exited with code {}", .program.display(), .arguments, .exit_code)]
pub struct Failure {
    pub program: PathBuf,
    pub arguments: Vec<String>,
    pub exit_code: i32,
    pub output: CapturedOutput,
}

/// A failure whose exit code matched an entry of the translation table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {failure}")]
pub struct TranslatedFailure {
    pub kind: String,
    pub fields: BTreeMap<String, String>,
    pub failure: Failure,
}

/// Map an exit code to a typed outcome.
///
/// Valid table first, then the translation table, then the generic failure.
pub fn map_exit_code(
    valid: &ExitCodeTable,
    translations: &ErrorTranslationTable,
    program: PathBuf,
    arguments: Vec<String>,
    exit_code: i32,
    output: Option<OutputBytes>,
) -> Result<Success> {
    if let Some(payload) = valid.lookup(exit_code) {
        return Ok(Success {
            payload: payload.clone(),
            output,
            exit_code,
        });
    }

    let failure = Failure {
        program,
        arguments,
        exit_code,
        output: output.into(),
    };

    match translations.lookup(exit_code) {
        Some(translation) => Err(ExecError::Translated(TranslatedFailure {
            kind: translation.kind.clone(),
            fields: translation.fields.clone(),
            failure,
        })),
        None => Err(ExecError::ExecutionFailed(failure)),
    }
}
