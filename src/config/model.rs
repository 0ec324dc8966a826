// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::exec::environment::Environment;
use crate::exec::outcome::Payload;
use crate::exec::policy::{ExecutionPolicy, Explanation, Flags, PolicyOverrides};
use crate::exec::tables::{ErrorTranslationTable, ExitCodeTable};
use crate::registry::DEFAULT_SEARCH_PATHS;
use crate::types::{EnvMode, OutputMode, RecoveryMode};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// search_paths = ["/usr/local/bin", "/usr/bin", "/bin"]
/// default_env = ["HOME=/tmp", "PATH=/usr/bin:/bin"]
/// output = "inherit"
///
/// [remote]
/// program = "ssh"
/// options = ["-o", "BatchMode=yes"]
///
/// [invocation.sync]
/// program = "rsync"
/// args = ["-a", "src/", "backup:/srv/src/"]
/// valid_exit_codes = { 0 = true, 24 = "vanished" }
/// translations = { 23 = { kind = "PartialTransfer" } }
/// recovery = "retry"
/// max_retries = 2
/// ```
///
/// All sections are optional. This is the unchecked form; see
/// [`ConfigFile`] for the validated one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub remote: RemoteSection,

    /// Keyed by invocation name.
    #[serde(default)]
    pub invocation: BTreeMap<String, RawInvocationConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    #[serde(default = "default_search_paths")]
    pub search_paths: Vec<String>,

    /// Environment used when a call does not supply one. `None` means the
    /// built-in single `HOME` entry.
    #[serde(default)]
    pub default_env: Option<Vec<String>>,

    /// `"inherit"`, `"discard"` (default) or `"capture"`.
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub dry_run: bool,

    #[serde(default)]
    pub verbose: bool,

    #[serde(default)]
    pub explanatory: bool,
}

fn default_search_paths() -> Vec<String> {
    DEFAULT_SEARCH_PATHS.iter().map(|s| s.to_string()).collect()
}

fn default_output() -> String {
    "discard".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            search_paths: default_search_paths(),
            default_env: None,
            output: default_output(),
            dry_run: false,
            verbose: false,
            explanatory: false,
        }
    }
}

/// `[remote]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSection {
    #[serde(default = "default_remote_program")]
    pub program: String,

    /// Extra transport arguments placed before the host.
    #[serde(default)]
    pub options: Vec<String>,
}

fn default_remote_program() -> String {
    "ssh".to_string()
}

impl Default for RemoteSection {
    fn default() -> Self {
        Self {
            program: default_remote_program(),
            options: Vec::new(),
        }
    }
}

/// `translations = { 23 = { kind = "...", fields = { ... } } }` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TranslationConfig {
    pub kind: String,

    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

/// `[invocation.<name>]` section, unchecked.
#[derive(Debug, Clone, Deserialize)]
pub struct RawInvocationConfig {
    /// Path (contains `/`) or symbolic name resolved on the search path.
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub env: Vec<String>,

    #[serde(default)]
    pub env_mode: EnvMode,

    #[serde(default)]
    pub output: Option<String>,

    /// TOML keys are strings; they are parsed as `i32` during validation.
    #[serde(default)]
    pub valid_exit_codes: BTreeMap<String, Payload>,

    #[serde(default)]
    pub translations: BTreeMap<String, TranslationConfig>,

    #[serde(default)]
    pub explanation: Option<String>,

    #[serde(default)]
    pub explanation_args: Vec<String>,

    #[serde(default)]
    pub recovery: RecoveryMode,

    #[serde(default)]
    pub max_retries: Option<u32>,

    /// If true, a program name missing from the search path is fatal.
    #[serde(default)]
    pub required: bool,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub settings: Settings,
    pub remote: RemoteSection,
    pub invocations: BTreeMap<String, InvocationConfig>,
}

impl ConfigFile {
    /// Assemble without re-validating (used by `TryFrom`).
    pub(crate) fn new_unchecked(
        settings: Settings,
        remote: RemoteSection,
        invocations: BTreeMap<String, InvocationConfig>,
    ) -> Self {
        Self {
            settings,
            remote,
            invocations,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub search_paths: Vec<PathBuf>,
    pub default_env: Environment,
    pub output: OutputMode,
    pub flags: Flags,
}

impl Settings {
    /// Ambient policy installed at startup.
    pub fn ambient_policy(&self) -> ExecutionPolicy {
        ExecutionPolicy::with_defaults(self.default_env.clone(), self.output.into(), self.flags)
    }
}

#[derive(Debug, Clone)]
pub struct InvocationConfig {
    pub program: String,
    pub args: Vec<String>,
    pub env: Environment,
    pub env_mode: EnvMode,
    pub output: Option<OutputMode>,
    pub valid_exit_codes: Option<ExitCodeTable>,
    pub translations: ErrorTranslationTable,
    pub explanation: Option<Explanation>,
    pub recovery: RecoveryMode,
    pub max_retries: u32,
    pub required: bool,
}

impl InvocationConfig {
    /// Call-site overrides this invocation applies on top of the ambient policy.
    pub fn overrides(&self) -> PolicyOverrides {
        let mut overrides = PolicyOverrides::new();

        if !self.env.is_empty() || self.env_mode == EnvMode::Replace {
            overrides = match self.env_mode {
                EnvMode::Replace => overrides.env(self.env.clone()),
                EnvMode::Prepend => overrides.env_prepend(self.env.entries().iter().cloned()),
            };
        }
        if let Some(output) = self.output {
            overrides = overrides.output(output);
        }
        if let Some(table) = &self.valid_exit_codes {
            overrides = overrides.exit_codes(table.clone());
        }
        if !self.translations.is_empty() {
            overrides = overrides.translations(self.translations.clone());
        }
        if let Some(explanation) = &self.explanation {
            overrides = overrides.explain(explanation.clone());
        }
        overrides
    }
}
