// src/config/validate.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::model::{
    ConfigFile, ConfigSection, InvocationConfig, RawConfigFile, RawInvocationConfig, Settings,
};
use crate::errors::{ExecError, Result};
use crate::exec::environment::{validate_entry, Environment};
use crate::exec::policy::{Explanation, Flags};
use crate::exec::tables::{ErrorTranslationTable, ExitCodeTable, Translation};
use crate::types::{OutputMode, RecoveryMode};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ExecError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let settings = validate_settings(&raw.config)?;
        let mut invocations = BTreeMap::new();
        for (name, inv) in raw.invocation.iter() {
            invocations.insert(name.clone(), validate_invocation(name, inv)?);
        }
        Ok(ConfigFile::new_unchecked(settings, raw.remote, invocations))
    }
}

fn validate_settings(cfg: &ConfigSection) -> Result<Settings> {
    if cfg.search_paths.is_empty() {
        return Err(ExecError::ConfigError(
            "[config].search_paths must list at least one directory".to_string(),
        ));
    }

    let default_env = match &cfg.default_env {
        Some(entries) => {
            validate_env_entries("[config].default_env", entries)?;
            Environment::new(entries.iter().cloned())
        }
        None => Environment::minimal(),
    };

    Ok(Settings {
        search_paths: cfg.search_paths.iter().map(PathBuf::from).collect(),
        default_env,
        output: parse_output("[config].output", &cfg.output)?,
        flags: Flags {
            dry_run: cfg.dry_run,
            verbose: cfg.verbose,
            explanatory: cfg.explanatory,
        },
    })
}

fn validate_invocation(name: &str, inv: &RawInvocationConfig) -> Result<InvocationConfig> {
    if inv.program.trim().is_empty() {
        return Err(ExecError::ConfigError(format!(
            "invocation '{}' must name a program",
            name
        )));
    }

    validate_env_entries(&format!("invocation '{}' env", name), &inv.env)?;

    let output = inv
        .output
        .as_deref()
        .map(|s| parse_output(&format!("invocation '{}' output", name), s))
        .transpose()?;

    let valid_exit_codes = if inv.valid_exit_codes.is_empty() {
        None
    } else {
        let mut entries = Vec::new();
        for (code, payload) in inv.valid_exit_codes.iter() {
            entries.push((parse_exit_code(name, code)?, payload.clone()));
        }
        Some(ExitCodeTable::from_entries(entries))
    };

    let mut translations = ErrorTranslationTable::new();
    for (code, tr) in inv.translations.iter() {
        if tr.kind.trim().is_empty() {
            return Err(ExecError::ConfigError(format!(
                "invocation '{}' translation for exit code {} has an empty kind",
                name, code
            )));
        }
        let translation = Translation {
            kind: tr.kind.clone(),
            fields: tr.fields.clone(),
        };
        translations = translations.with(parse_exit_code(name, code)?, translation);
    }

    let max_retries = inv.max_retries.unwrap_or(0);
    if inv.recovery == RecoveryMode::Retry && max_retries == 0 {
        return Err(ExecError::ConfigError(format!(
            "invocation '{}' uses recovery = \"retry\" and needs max_retries >= 1",
            name
        )));
    }

    let explanation = inv
        .explanation
        .as_ref()
        .map(|t| Explanation::new(t.clone()).args(inv.explanation_args.iter()));

    Ok(InvocationConfig {
        program: inv.program.clone(),
        args: inv.args.clone(),
        env: Environment::new(inv.env.iter().cloned()),
        env_mode: inv.env_mode,
        output,
        valid_exit_codes,
        translations,
        explanation,
        recovery: inv.recovery,
        max_retries,
        required: inv.required,
    })
}

fn validate_env_entries(context: &str, entries: &[String]) -> Result<()> {
    for entry in entries {
        validate_entry(entry).map_err(|msg| ExecError::ConfigError(format!("{context}: {msg}")))?;
    }
    Ok(())
}

/// An unknown output mode is a sink error, not a generic config error.
fn parse_output(context: &str, value: &str) -> Result<OutputMode> {
    value
        .parse::<OutputMode>()
        .map_err(|msg| ExecError::InvalidOutputSink(format!("{context}: {msg}")))
}

fn parse_exit_code(invocation: &str, key: &str) -> Result<i32> {
    key.trim().parse::<i32>().map_err(|_| {
        ExecError::ConfigError(format!(
            "invocation '{}' has non-integer exit code key '{}'",
            invocation, key
        ))
    })
}
