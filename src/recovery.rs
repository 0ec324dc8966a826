// src/recovery.rs

//! Retry / recovery frontend for named invocations.
//!
//! A [`NamedInvocation`] is a fixed, pre-configured call. When it fails with
//! a generic or translated execution failure, a [`RecoveryPolicy`] decides
//! what happens next: retry, retry with one more environment entry, accept
//! the failure as a no-op success, or fail for good. Spawn errors,
//! configuration errors and missing required executables are never offered
//! for recovery.
//!
//! Non-interactive callers must pick a deterministic policy; the default is
//! [`AlwaysFail`], which propagates the first failure unchanged.

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use tracing::{info, warn};

use crate::config::InvocationConfig;
use crate::errors::{ExecError, Result};
use crate::exec::argument::Argument;
use crate::exec::dispatcher::{Dispatcher, Target};
use crate::exec::environment::validate_entry;
use crate::exec::outcome::{OutputBytes, Success};
use crate::exec::policy::PolicyOverrides;
use crate::types::RecoveryMode;

/// Decision taken at the failure point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryChoice {
    Retry,
    /// Retry with one extra `KEY=VALUE` entry shadowing the environment.
    RetryWithEnv(String),
    AcceptAsSuccess,
    Fail,
}

pub trait RecoveryPolicy {
    /// `attempt` is 1 for the first failure of an invocation.
    fn decide(&mut self, invocation: &str, attempt: u32, error: &ExecError) -> RecoveryChoice;
}

/// Propagate every failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysFail;

impl RecoveryPolicy for AlwaysFail {
    fn decide(&mut self, _: &str, _: u32, _: &ExecError) -> RecoveryChoice {
        RecoveryChoice::Fail
    }
}

/// Treat every failure as a successful no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptFailures;

impl RecoveryPolicy for AcceptFailures {
    fn decide(&mut self, _: &str, _: u32, _: &ExecError) -> RecoveryChoice {
        RecoveryChoice::AcceptAsSuccess
    }
}

/// Retry unchanged up to `max_retries` times, then fail.
#[derive(Debug, Clone, Copy)]
pub struct RetryUpTo {
    pub max_retries: u32,
}

impl RecoveryPolicy for RetryUpTo {
    fn decide(&mut self, _: &str, attempt: u32, _: &ExecError) -> RecoveryChoice {
        if attempt <= self.max_retries {
            RecoveryChoice::Retry
        } else {
            RecoveryChoice::Fail
        }
    }
}

/// Replays a fixed list of choices; `Fail` once exhausted.
#[derive(Debug, Clone, Default)]
pub struct Scripted {
    choices: VecDeque<RecoveryChoice>,
}

impl Scripted {
    pub fn new(choices: impl IntoIterator<Item = RecoveryChoice>) -> Self {
        Self {
            choices: choices.into_iter().collect(),
        }
    }
}

impl RecoveryPolicy for Scripted {
    fn decide(&mut self, _: &str, _: u32, _: &ExecError) -> RecoveryChoice {
        self.choices.pop_front().unwrap_or(RecoveryChoice::Fail)
    }
}

/// Asks an operator on a reader/writer pair.
///
/// End of input counts as `Fail` so a closed stdin can never hang the caller.
#[derive(Debug)]
pub struct Interactive<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Interactive<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn prompt(
        &mut self,
        invocation: &str,
        attempt: u32,
        error: &ExecError,
    ) -> std::io::Result<RecoveryChoice> {
        writeln!(self.output, "invocation '{invocation}' failed (attempt {attempt}): {error}")?;
        if let Some(output) = error.failure().and_then(|f| f.output.bytes()) {
            if !output.is_empty() {
                writeln!(self.output, "--- captured output ---\n{output}")?;
            }
        }

        loop {
            write!(
                self.output,
                "[r]etry, [e]nv KEY=VALUE then retry, [a]ccept as success, [f]ail: "
            )?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(RecoveryChoice::Fail);
            }
            let line = line.trim();
            let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));

            match cmd {
                "r" | "retry" => return Ok(RecoveryChoice::Retry),
                "a" | "accept" => return Ok(RecoveryChoice::AcceptAsSuccess),
                "f" | "fail" => return Ok(RecoveryChoice::Fail),
                "e" | "env" => match validate_entry(rest.trim()) {
                    Ok(()) => return Ok(RecoveryChoice::RetryWithEnv(rest.trim().to_string())),
                    Err(msg) => writeln!(self.output, "{msg}")?,
                },
                other => writeln!(self.output, "unknown choice '{other}'")?,
            }
        }
    }
}

impl<R: BufRead, W: Write> RecoveryPolicy for Interactive<R, W> {
    fn decide(&mut self, invocation: &str, attempt: u32, error: &ExecError) -> RecoveryChoice {
        match self.prompt(invocation, attempt, error) {
            Ok(choice) => choice,
            Err(e) => {
                warn!(error = %e, "recovery prompt failed; treating as failure");
                RecoveryChoice::Fail
            }
        }
    }
}

/// Deterministic policy for a configured recovery mode.
///
/// Returns `None` for [`RecoveryMode::Interactive`]; the caller has to
/// supply the operator's reader and writer.
pub fn automated_policy(mode: RecoveryMode, max_retries: u32) -> Option<Box<dyn RecoveryPolicy>> {
    match mode {
        RecoveryMode::Fail => Some(Box::new(AlwaysFail)),
        RecoveryMode::Accept => Some(Box::new(AcceptFailures)),
        RecoveryMode::Retry => Some(Box::new(RetryUpTo { max_retries })),
        RecoveryMode::Interactive => None,
    }
}

/// How a supervised invocation ended without an error.
#[derive(Debug)]
pub enum RecoveryOutcome {
    Completed(Success),
    /// The failure was accepted as a successful no-op.
    Accepted(ExecError),
}

impl RecoveryOutcome {
    pub fn output(&self) -> Option<&OutputBytes> {
        match self {
            RecoveryOutcome::Completed(s) => s.output.as_ref(),
            RecoveryOutcome::Accepted(_) => None,
        }
    }
}

/// A named, pre-configured invocation.
#[derive(Debug, Clone)]
pub struct NamedInvocation {
    pub name: String,
    pub target: Target,
    pub arguments: Vec<Argument>,
    pub overrides: PolicyOverrides,
    /// Fail fast if a symbolic program name cannot be resolved.
    pub required: bool,
}

impl NamedInvocation {
    pub fn new(name: impl Into<String>, target: impl Into<Target>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            arguments: Vec::new(),
            overrides: PolicyOverrides::new(),
            required: false,
        }
    }

    pub fn from_config(name: &str, cfg: &InvocationConfig) -> Self {
        let mut invocation = NamedInvocation::new(name, cfg.program.as_str())
            .overrides(cfg.overrides())
            .required(cfg.required);
        invocation.arguments = cfg.args.iter().map(Argument::from).collect();
        invocation
    }

    pub fn arg(mut self, arg: impl Into<Argument>) -> Self {
        self.arguments.push(arg.into());
        self
    }

    pub fn overrides(mut self, overrides: PolicyOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Run (blocking) and let `policy` resolve execution failures.
    pub fn run(
        &self,
        dispatcher: &Dispatcher,
        policy: &mut dyn RecoveryPolicy,
    ) -> Result<RecoveryOutcome> {
        if self.required {
            if let Target::Name(name) = &self.target {
                dispatcher.require(name)?;
            }
        }

        let mut overrides = self.overrides.clone();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match dispatcher.run(self.target.clone(), self.arguments.clone(), &overrides) {
                Ok(success) => return Ok(RecoveryOutcome::Completed(success)),
                Err(err) if err.is_execution_failure() => err,
                Err(err) => return Err(err),
            };

            let choice = policy.decide(&self.name, attempt, &err);
            warn!(invocation = %self.name, attempt, ?choice, error = %err, "recovery decision");

            match choice {
                RecoveryChoice::Retry => {}
                RecoveryChoice::RetryWithEnv(entry) => {
                    info!(invocation = %self.name, %entry, "retrying with extra environment entry");
                    overrides = overrides.env_prepend([entry]);
                }
                RecoveryChoice::AcceptAsSuccess => return Ok(RecoveryOutcome::Accepted(err)),
                RecoveryChoice::Fail => return Err(err),
            }
        }
    }
}
