// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`argument`] defines argument tokens and their flattening rule.
//! - [`environment`] is the ordered `KEY=VALUE` child environment.
//! - [`tables`] holds the valid-exit-code and error-translation tables.
//! - [`outcome`] defines `Success` / `Failure` and the exit-code mapping.
//! - [`policy`] is the per-invocation settings snapshot and its overrides.
//! - [`spawn`] is the platform spawn primitive (`Spawner`, `StdSpawner`).
//! - [`handle`] owns a running child for non-blocking callers.
//! - [`trace`] prints explanation / invocation lines.
//! - [`dispatcher`] ties all of the above together.

pub mod argument;
pub mod dispatcher;
pub mod environment;
pub mod handle;
pub mod outcome;
pub mod policy;
pub mod spawn;
pub mod tables;
pub mod trace;

pub use argument::{flatten_arguments, Argument};
pub use dispatcher::{CommandLine, Dispatcher, Execution, Target};
pub use environment::Environment;
pub use handle::{OutputLines, ProcessHandle};
pub use outcome::{CapturedOutput, Failure, OutputBytes, Payload, Success, TranslatedFailure};
pub use policy::{
    ExecutionPolicy, Explanation, Flags, InputSource, OutputSink, PolicyOverrides, SharedWriter,
};
pub use spawn::{ChildProcess, SpawnRequest, Spawner, StdSpawner, StdoutTarget};
pub use tables::{ErrorTranslationTable, ExitCodeTable, Translation};
pub use trace::TraceChannel;
