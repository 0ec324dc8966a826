#![allow(dead_code)]

use std::collections::BTreeMap;

use execward::config::{
    ConfigFile, ConfigSection, RawConfigFile, RawInvocationConfig, RemoteSection,
    TranslationConfig,
};
use execward::errors::Result;
use execward::exec::Payload;
use execward::types::{EnvMode, RecoveryMode};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                remote: RemoteSection::default(),
                invocation: BTreeMap::new(),
            },
        }
    }

    pub fn with_search_path(mut self, dir: &str) -> Self {
        self.config.config.search_paths.push(dir.to_string());
        self
    }

    pub fn with_search_paths(mut self, dirs: &[&str]) -> Self {
        self.config.config.search_paths = dirs.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn with_default_env(mut self, entries: &[&str]) -> Self {
        self.config.config.default_env = Some(entries.iter().map(|e| e.to_string()).collect());
        self
    }

    pub fn with_output(mut self, mode: &str) -> Self {
        self.config.config.output = mode.to_string();
        self
    }

    pub fn dry_run(mut self, val: bool) -> Self {
        self.config.config.dry_run = val;
        self
    }

    pub fn verbose(mut self, val: bool) -> Self {
        self.config.config.verbose = val;
        self
    }

    pub fn with_remote(mut self, program: &str, options: &[&str]) -> Self {
        self.config.remote = RemoteSection {
            program: program.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
        };
        self
    }

    pub fn with_invocation(mut self, name: &str, invocation: RawInvocationConfig) -> Self {
        self.config.invocation.insert(name.to_string(), invocation);
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `RawInvocationConfig`.
pub struct InvocationConfigBuilder {
    invocation: RawInvocationConfig,
}

impl InvocationConfigBuilder {
    pub fn new(program: &str) -> Self {
        Self {
            invocation: RawInvocationConfig {
                program: program.to_string(),
                args: vec![],
                env: vec![],
                env_mode: EnvMode::Prepend,
                output: None,
                valid_exit_codes: BTreeMap::new(),
                translations: BTreeMap::new(),
                explanation: None,
                explanation_args: vec![],
                recovery: RecoveryMode::Fail,
                max_retries: None,
                required: false,
            },
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.invocation.args.push(arg.to_string());
        self
    }

    pub fn env(mut self, entry: &str) -> Self {
        self.invocation.env.push(entry.to_string());
        self
    }

    pub fn env_mode(mut self, mode: EnvMode) -> Self {
        self.invocation.env_mode = mode;
        self
    }

    pub fn output(mut self, mode: &str) -> Self {
        self.invocation.output = Some(mode.to_string());
        self
    }

    pub fn ok(mut self, code: &str, payload: impl Into<Payload>) -> Self {
        self.invocation
            .valid_exit_codes
            .insert(code.to_string(), payload.into());
        self
    }

    pub fn translate(mut self, code: &str, kind: &str) -> Self {
        self.invocation.translations.insert(
            code.to_string(),
            TranslationConfig {
                kind: kind.to_string(),
                fields: BTreeMap::new(),
            },
        );
        self
    }

    pub fn explanation(mut self, template: &str, args: &[&str]) -> Self {
        self.invocation.explanation = Some(template.to_string());
        self.invocation.explanation_args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn recovery(mut self, mode: RecoveryMode) -> Self {
        self.invocation.recovery = mode;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.invocation.max_retries = Some(n);
        self
    }

    pub fn required(mut self, val: bool) -> Self {
        self.invocation.required = val;
        self
    }

    pub fn build(self) -> RawInvocationConfig {
        self.invocation
    }
}
