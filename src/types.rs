use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Where a program's standard output goes when no writer is supplied.
///
/// - `Inherit`: the child writes straight to our own stdout.
/// - `Discard`: output is sent to the null device (default).
/// - `Capture`: output is buffered and returned as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Inherit,
    Discard,
    Capture,
}

impl Default for OutputMode {
    fn default() -> Self {
        OutputMode::Discard
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inherit" | "true" => Ok(OutputMode::Inherit),
            "discard" | "false" | "null" => Ok(OutputMode::Discard),
            "capture" => Ok(OutputMode::Capture),
            other => Err(format!(
                "invalid output mode: {other} (expected \"inherit\", \"discard\" or \"capture\")"
            )),
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutputMode::Inherit => "inherit",
            OutputMode::Discard => "discard",
            OutputMode::Capture => "capture",
        };
        f.write_str(s)
    }
}

/// Whether the dispatcher waits for the child to exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitMode {
    Blocking,
    NonBlocking,
}

impl Default for WaitMode {
    fn default() -> Self {
        WaitMode::Blocking
    }
}

impl fmt::Display for WaitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitMode::Blocking => f.write_str("blocking"),
            WaitMode::NonBlocking => f.write_str("non-blocking"),
        }
    }
}

/// How an invocation's own environment combines with the ambient one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvMode {
    /// New entries shadow the ambient ones (default).
    Prepend,
    /// The ambient environment is dropped entirely.
    Replace,
}

impl Default for EnvMode {
    fn default() -> Self {
        EnvMode::Prepend
    }
}

/// Recovery policy selected for a named invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryMode {
    Fail,
    Accept,
    Retry,
    Interactive,
}

impl Default for RecoveryMode {
    fn default() -> Self {
        RecoveryMode::Fail
    }
}

impl FromStr for RecoveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail" => Ok(RecoveryMode::Fail),
            "accept" => Ok(RecoveryMode::Accept),
            "retry" => Ok(RecoveryMode::Retry),
            "interactive" => Ok(RecoveryMode::Interactive),
            other => Err(format!(
                "invalid recovery mode: {other} (expected fail, accept, retry or interactive)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_mode_accepts_boolean_spellings() {
        assert_eq!("true".parse::<OutputMode>().unwrap(), OutputMode::Inherit);
        assert_eq!("False".parse::<OutputMode>().unwrap(), OutputMode::Discard);
        assert_eq!(" capture ".parse::<OutputMode>().unwrap(), OutputMode::Capture);
    }

    #[test]
    fn output_mode_rejects_unknown() {
        let err = "tee".parse::<OutputMode>().unwrap_err();
        assert!(err.contains("tee"));
    }

    #[test]
    fn recovery_mode_round_trips_names() {
        for mode in ["fail", "accept", "retry", "interactive"] {
            assert!(mode.parse::<RecoveryMode>().is_ok(), "{mode}");
        }
        assert!("sometimes".parse::<RecoveryMode>().is_err());
    }
}
