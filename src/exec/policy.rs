// src/exec/policy.rs

//! Execution policy: the immutable settings snapshot one invocation runs
//! under, and the call-site overrides merged into it.
//!
//! The ambient policy lives in [`crate::context`]; `ExecutionPolicy::merged`
//! layers a [`PolicyOverrides`] on top and yields a fresh snapshot. Scopes in
//! the context module reuse the same merge, so "scope override" and
//! "call-site override" have identical semantics.

use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::errors::{ExecError, Result};
use crate::exec::environment::Environment;
use crate::exec::tables::{ErrorTranslationTable, ExitCodeTable, Translation};
use crate::exec::outcome::Payload;
use crate::types::{OutputMode, WaitMode};

/// A writer shared between the caller and the dispatcher.
pub type SharedWriter = Arc<Mutex<dyn Write + Send>>;

/// Where standard output goes for one invocation.
#[derive(Clone)]
pub enum OutputSink {
    Inherit,
    Discard,
    Capture,
    /// Caller-supplied stream. Only valid for blocking invocations.
    Writer(SharedWriter),
}

impl OutputSink {
    pub fn is_capture(&self) -> bool {
        matches!(self, OutputSink::Capture)
    }

    /// Label used in traces.
    pub fn label(&self) -> &'static str {
        match self {
            OutputSink::Inherit => "inherit",
            OutputSink::Discard => "discard",
            OutputSink::Capture => "capture",
            OutputSink::Writer(_) => "writer",
        }
    }
}

impl Default for OutputSink {
    fn default() -> Self {
        OutputSink::Discard
    }
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<OutputMode> for OutputSink {
    fn from(mode: OutputMode) -> Self {
        match mode {
            OutputMode::Inherit => OutputSink::Inherit,
            OutputMode::Discard => OutputSink::Discard,
            OutputMode::Capture => OutputSink::Capture,
        }
    }
}

/// `true` inherits our stdout, `false` discards.
impl From<bool> for OutputSink {
    fn from(inherit: bool) -> Self {
        if inherit {
            OutputSink::Inherit
        } else {
            OutputSink::Discard
        }
    }
}

/// Standard input of the child.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InputSource {
    #[default]
    Null,
    Inherit,
    File(PathBuf),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub dry_run: bool,
    pub verbose: bool,
    pub explanatory: bool,
}

impl Flags {
    /// Any of the three flags prints the explanation text.
    pub fn announces_explanation(&self) -> bool {
        self.dry_run || self.verbose || self.explanatory
    }

    /// Verbose and dry-run also print the resolved invocation.
    pub fn traces_invocation(&self) -> bool {
        self.dry_run || self.verbose
    }
}

/// Format template plus arguments, rendered only when a trace is printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation {
    template: String,
    args: Vec<String>,
}

impl Explanation {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl ToString) -> Self {
        self.args.push(arg.to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.args.extend(args.into_iter().map(|a| a.to_string()));
        self
    }

    /// Substitute `{}` placeholders positionally.
    ///
    /// Surplus arguments are appended space-separated; placeholders without an
    /// argument are left in place.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut args = self.args.iter();
        let mut rest = self.template.as_str();

        while let Some(idx) = rest.find("{}") {
            out.push_str(&rest[..idx]);
            match args.next() {
                Some(a) => out.push_str(a),
                None => out.push_str("{}"),
            }
            rest = &rest[idx + 2..];
        }
        out.push_str(rest);

        for extra in args {
            out.push(' ');
            out.push_str(extra);
        }
        out
    }
}

/// Immutable settings for one invocation.
#[derive(Debug, Clone)]
pub struct ExecutionPolicy {
    flags: Flags,
    valid_exit_codes: ExitCodeTable,
    translations: ErrorTranslationTable,
    environment: Environment,
    input: InputSource,
    output: OutputSink,
    wait: WaitMode,
    explanation: Option<Explanation>,
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self {
            flags: Flags::default(),
            valid_exit_codes: ExitCodeTable::default(),
            translations: ErrorTranslationTable::default(),
            environment: Environment::minimal(),
            input: InputSource::Null,
            output: OutputSink::Discard,
            wait: WaitMode::Blocking,
            explanation: None,
        }
    }
}

impl ExecutionPolicy {
    /// Base policy with a specific default environment and output.
    pub fn with_defaults(environment: Environment, output: OutputSink, flags: Flags) -> Self {
        Self {
            flags,
            environment,
            output,
            ..Self::default()
        }
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn valid_exit_codes(&self) -> &ExitCodeTable {
        &self.valid_exit_codes
    }

    pub fn translations(&self) -> &ErrorTranslationTable {
        &self.translations
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn input(&self) -> &InputSource {
        &self.input
    }

    pub fn output(&self) -> &OutputSink {
        &self.output
    }

    pub fn wait(&self) -> WaitMode {
        self.wait
    }

    pub fn explanation(&self) -> Option<&Explanation> {
        self.explanation.as_ref()
    }

    /// New snapshot with `overrides` layered on top of `self`.
    pub fn merged(&self, overrides: &PolicyOverrides) -> ExecutionPolicy {
        let mut next = self.clone();

        if let Some(v) = overrides.dry_run {
            next.flags.dry_run = v;
        }
        if let Some(v) = overrides.verbose {
            next.flags.verbose = v;
        }
        if let Some(v) = overrides.explanatory {
            next.flags.explanatory = v;
        }
        if let Some(table) = &overrides.valid_exit_codes {
            next.valid_exit_codes = table.clone();
        }
        if let Some(table) = &overrides.translations {
            next.translations = table.clone();
        }
        if let Some(env) = &overrides.environment {
            next.environment = env.clone();
        }
        if let Some(ext) = &overrides.env_extension {
            next.environment = next.environment.prepended(ext);
        }
        if let Some(input) = &overrides.input {
            next.input = input.clone();
        }
        if let Some(output) = &overrides.output {
            next.output = output.clone();
        }
        if let Some(wait) = overrides.wait {
            next.wait = wait;
        }
        if let Some(explanation) = &overrides.explanation {
            next.explanation = Some(explanation.clone());
        }

        next
    }

    /// Reject combinations that can never run, before anything is spawned.
    pub fn validate(&self) -> Result<()> {
        if matches!(self.output, OutputSink::Writer(_)) && self.wait == WaitMode::NonBlocking {
            return Err(ExecError::InvalidOutputSink(
                "a writer sink requires blocking mode; use capture for non-blocking calls"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Partial settings: each `Some` replaces the corresponding policy field.
///
/// `env_prepend` is applied after `env`, so both may be combined.
#[derive(Debug, Clone, Default)]
pub struct PolicyOverrides {
    pub dry_run: Option<bool>,
    pub verbose: Option<bool>,
    pub explanatory: Option<bool>,
    pub valid_exit_codes: Option<ExitCodeTable>,
    pub translations: Option<ErrorTranslationTable>,
    pub environment: Option<Environment>,
    pub env_extension: Option<Environment>,
    pub input: Option<InputSource>,
    pub output: Option<OutputSink>,
    pub wait: Option<WaitMode>,
    pub explanation: Option<Explanation>,
}

impl PolicyOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dry_run(mut self, on: bool) -> Self {
        self.dry_run = Some(on);
        self
    }

    pub fn verbose(mut self, on: bool) -> Self {
        self.verbose = Some(on);
        self
    }

    pub fn explanatory(mut self, on: bool) -> Self {
        self.explanatory = Some(on);
        self
    }

    pub fn exit_codes(mut self, table: ExitCodeTable) -> Self {
        self.valid_exit_codes = Some(table);
        self
    }

    /// Add one valid exit code on top of whatever table is already set here.
    pub fn ok_code(mut self, code: i32, payload: impl Into<Payload>) -> Self {
        let table = self.valid_exit_codes.take().unwrap_or_default();
        self.valid_exit_codes = Some(table.with(code, payload));
        self
    }

    pub fn translations(mut self, table: ErrorTranslationTable) -> Self {
        self.translations = Some(table);
        self
    }

    pub fn translate(mut self, code: i32, translation: Translation) -> Self {
        let table = self.translations.take().unwrap_or_default();
        self.translations = Some(table.with(code, translation));
        self
    }

    /// Replace the environment entirely.
    pub fn env(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Prepend entries; repeated calls accumulate, latest first.
    pub fn env_prepend<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ext = Environment::new(entries);
        self.env_extension = Some(match self.env_extension.take() {
            Some(existing) => existing.prepended(&ext),
            None => ext,
        });
        self
    }

    pub fn input(mut self, input: InputSource) -> Self {
        self.input = Some(input);
        self
    }

    pub fn output(mut self, output: impl Into<OutputSink>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn capture(self) -> Self {
        self.output(OutputSink::Capture)
    }

    pub fn wait(mut self, wait: WaitMode) -> Self {
        self.wait = Some(wait);
        self
    }

    pub fn asynchronous(self) -> Self {
        self.wait(WaitMode::NonBlocking)
    }

    pub fn explain(mut self, explanation: Explanation) -> Self {
        self.explanation = Some(explanation);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_substitutes_in_order() {
        let e = Explanation::new("copy {} to {}").arg("a").arg("b");
        assert_eq!(e.render(), "copy a to b");
    }

    #[test]
    fn render_tolerates_mismatched_arity() {
        assert_eq!(Explanation::new("x {} {}").arg(1).render(), "x 1 {}");
        assert_eq!(Explanation::new("x").args(["1", "2"]).render(), "x 1 2");
    }

    #[test]
    fn merge_leaves_base_untouched() {
        let base = ExecutionPolicy::default();
        let next = base.merged(&PolicyOverrides::new().dry_run(true).capture());
        assert!(next.flags().dry_run);
        assert!(next.output().is_capture());
        assert!(!base.flags().dry_run);
        assert!(matches!(base.output(), OutputSink::Discard));
    }

    #[test]
    fn replace_then_prepend() {
        let base = ExecutionPolicy::default();
        let next = base.merged(
            &PolicyOverrides::new()
                .env(Environment::new(["A=1"]))
                .env_prepend(["A=2"]),
        );
        assert_eq!(next.environment().entries(), &["A=2", "A=1"]);
    }

    #[test]
    fn writer_sink_is_rejected_for_non_blocking() {
        let writer: SharedWriter = Arc::new(Mutex::new(Vec::<u8>::new()));
        let policy = ExecutionPolicy::default().merged(
            &PolicyOverrides::new()
                .output(OutputSink::Writer(writer))
                .asynchronous(),
        );
        assert!(matches!(policy.validate(), Err(ExecError::InvalidOutputSink(_))));
    }
}
