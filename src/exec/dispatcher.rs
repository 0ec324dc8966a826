// src/exec/dispatcher.rs

//! The execution dispatcher.
//!
//! `execute` turns "run program P with arguments A" into a typed outcome:
//!
//! 1. snapshot the ambient policy merged with call-site overrides,
//! 2. resolve the target (path, registry name, or pre-built command line),
//! 3. print the explanation / invocation trace when flags ask for it,
//! 4. in dry-run mode, synthesize the success payload for exit code 0,
//! 5. otherwise spawn, then either hand back the [`ProcessHandle`]
//!    (non-blocking) or wait and map the exit code (blocking).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::context;
use crate::errors::{ExecError, Result};
use crate::exec::argument::{flatten_arguments, Argument};
use crate::exec::handle::{Invocation, ProcessHandle};
use crate::exec::outcome::{OutputBytes, Payload, Success};
use crate::exec::policy::{ExecutionPolicy, OutputSink, PolicyOverrides};
use crate::exec::spawn::{SpawnRequest, Spawner, StdSpawner, StdoutTarget};
use crate::exec::trace::TraceChannel;
use crate::registry::{default_search_paths, ExecutableRegistry, Resolution};
use crate::types::WaitMode;

/// A program plus leading arguments, already assembled by a collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub arguments: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            arguments: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.arguments.push(arg.into());
        self
    }
}

/// What to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Path(PathBuf),
    /// Looked up through the executable registry.
    Name(String),
    Command(CommandLine),
}

/// A string containing a path separator is a path, anything else a name.
impl From<&str> for Target {
    fn from(s: &str) -> Self {
        if looks_like_path(s) {
            Target::Path(PathBuf::from(s))
        } else {
            Target::Name(s.to_string())
        }
    }
}

impl From<String> for Target {
    fn from(s: String) -> Self {
        Target::from(s.as_str())
    }
}

impl From<PathBuf> for Target {
    fn from(p: PathBuf) -> Self {
        Target::Path(p)
    }
}

impl From<&Path> for Target {
    fn from(p: &Path) -> Self {
        Target::Path(p.to_path_buf())
    }
}

impl From<CommandLine> for Target {
    fn from(c: CommandLine) -> Self {
        Target::Command(c)
    }
}

fn looks_like_path(s: &str) -> bool {
    s.contains('/') || s.contains(std::path::MAIN_SEPARATOR)
}

/// Result of `execute`: finished (blocking) or still running (non-blocking).
#[derive(Debug)]
pub enum Execution {
    Finished(Success),
    Spawned(ProcessHandle),
}

impl Execution {
    /// Reap if needed and return the mapped outcome.
    pub fn wait(self) -> Result<Success> {
        match self {
            Execution::Finished(success) => Ok(success),
            Execution::Spawned(handle) => handle.wait(),
        }
    }

    pub fn is_spawned(&self) -> bool {
        matches!(self, Execution::Spawned(_))
    }
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ExecutableRegistry>,
    spawner: Arc<dyn Spawner>,
    search_paths: Vec<PathBuf>,
    trace: TraceChannel,
}

impl Dispatcher {
    pub fn new(registry: Arc<ExecutableRegistry>, spawner: Arc<dyn Spawner>) -> Self {
        Self {
            registry,
            spawner,
            search_paths: default_search_paths(),
            trace: TraceChannel::stderr(),
        }
    }

    /// Real processes, the global registry, default search path.
    pub fn system() -> Self {
        Self::new(ExecutableRegistry::global(), Arc::new(StdSpawner))
    }

    pub fn with_search_paths(mut self, search_paths: Vec<PathBuf>) -> Self {
        self.search_paths = search_paths;
        self
    }

    pub fn with_trace(mut self, trace: TraceChannel) -> Self {
        self.trace = trace;
        self
    }

    pub fn registry(&self) -> &ExecutableRegistry {
        &self.registry
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    pub fn which(&self, name: &str) -> Resolution {
        self.registry.resolve(name, &self.search_paths)
    }

    pub fn require(&self, name: &str) -> Result<PathBuf> {
        self.registry.require(name, &self.search_paths)
    }

    /// Run under the ambient policy merged with `overrides`.
    pub fn execute<I, A>(
        &self,
        target: impl Into<Target>,
        arguments: I,
        overrides: &PolicyOverrides,
    ) -> Result<Execution>
    where
        I: IntoIterator<Item = A>,
        A: Into<Argument>,
    {
        let policy = context::snapshot(overrides);
        self.execute_with_policy(target.into(), flatten_arguments(arguments), &policy)
    }

    /// Blocking call regardless of the ambient wait mode.
    pub fn run<I, A>(
        &self,
        target: impl Into<Target>,
        arguments: I,
        overrides: &PolicyOverrides,
    ) -> Result<Success>
    where
        I: IntoIterator<Item = A>,
        A: Into<Argument>,
    {
        let overrides = overrides.clone().wait(WaitMode::Blocking);
        self.execute(target, arguments, &overrides)?.wait()
    }

    /// Non-blocking call regardless of the ambient wait mode.
    pub fn spawn<I, A>(
        &self,
        target: impl Into<Target>,
        arguments: I,
        overrides: &PolicyOverrides,
    ) -> Result<ProcessHandle>
    where
        I: IntoIterator<Item = A>,
        A: Into<Argument>,
    {
        let overrides = overrides.clone().wait(WaitMode::NonBlocking);
        match self.execute(target, arguments, &overrides)? {
            Execution::Spawned(handle) => Ok(handle),
            Execution::Finished(success) => Ok(ProcessHandle::rehearsal(success)),
        }
    }

    /// Run with an explicit, already merged policy snapshot.
    pub fn execute_with_policy(
        &self,
        target: Target,
        arguments: Vec<String>,
        policy: &ExecutionPolicy,
    ) -> Result<Execution> {
        policy.validate()?;

        let (program, arguments) = self.resolve_target(target, arguments);
        let flags = policy.flags();

        if flags.announces_explanation() {
            if let Some(explanation) = policy.explanation() {
                self.trace.explanation(&explanation.render());
            }
        }
        if flags.traces_invocation() {
            self.trace.invocation(&program, &arguments, policy);
        }

        if flags.dry_run {
            let success = rehearse(policy);
            return Ok(match policy.wait() {
                WaitMode::Blocking => Execution::Finished(success),
                WaitMode::NonBlocking => Execution::Spawned(ProcessHandle::rehearsal(success)),
            });
        }

        let stdout = match policy.output() {
            OutputSink::Inherit => StdoutTarget::Inherit,
            OutputSink::Discard => StdoutTarget::Null,
            OutputSink::Capture | OutputSink::Writer(_) => StdoutTarget::Piped,
        };

        info!(
            program = %program.display(),
            args = arguments.len(),
            output = policy.output().label(),
            wait = %policy.wait(),
            "spawning program"
        );

        let request = SpawnRequest {
            program: program.clone(),
            arguments: arguments.clone(),
            environment: policy.environment().effective_pairs(),
            stdin: policy.input().clone(),
            stdout,
        };
        let child = self.spawner.spawn(request).map_err(|source| ExecError::Spawn {
            program: program.display().to_string(),
            source,
        })?;

        let handle = ProcessHandle::live(
            child,
            Invocation {
                program,
                arguments,
                valid_exit_codes: policy.valid_exit_codes().clone(),
                translations: policy.translations().clone(),
                output: policy.output().clone(),
            },
        );

        match policy.wait() {
            WaitMode::NonBlocking => Ok(Execution::Spawned(handle)),
            WaitMode::Blocking => handle.wait().map(Execution::Finished),
        }
    }

    fn resolve_target(&self, target: Target, arguments: Vec<String>) -> (PathBuf, Vec<String>) {
        match target {
            Target::Path(path) => (path, arguments),
            Target::Name(name) => (self.resolve_name(&name), arguments),
            Target::Command(cmd) => {
                let program = if looks_like_path(&cmd.program) {
                    PathBuf::from(&cmd.program)
                } else {
                    self.resolve_name(&cmd.program)
                };
                let mut all = cmd.arguments;
                all.extend(arguments);
                (program, all)
            }
        }
    }

    /// Unresolvable names are passed through as is; the registry has already
    /// logged the not-found warning and the spawn decides.
    fn resolve_name(&self, name: &str) -> PathBuf {
        match self.registry.resolve(name, &self.search_paths) {
            Resolution::Found(path) => path,
            Resolution::NotFound(_) => PathBuf::from(name),
        }
    }
}

/// Outcome of a dry run: the payload for exit code 0, never a failure.
fn rehearse(policy: &ExecutionPolicy) -> Success {
    let payload = policy
        .valid_exit_codes()
        .lookup(0)
        .cloned()
        .unwrap_or(Payload::Bool(true));
    Success {
        payload,
        output: policy.output().is_capture().then(OutputBytes::default),
        exit_code: 0,
    }
}
