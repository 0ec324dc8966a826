// src/lib.rs

pub mod cli;
pub mod config;
pub mod context;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod recovery;
pub mod registry;
pub mod remote;
pub mod types;

pub use errors::{ExecError, Result};
pub use exec::{Dispatcher, Execution, PolicyOverrides, ProcessHandle, Success, Target};
pub use registry::{ExecutableRegistry, Resolution};

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use tracing::{debug, info};

use crate::cli::{CliArgs, Command, InvokeArgs, RemoteArgs, RunArgs, WhichArgs};
use crate::config::{ConfigFile, RawConfigFile, default_config_path, load_and_validate};
use crate::exec::environment::{Environment, validate_entry};
use crate::exec::outcome::OutputBytes;
use crate::exec::policy::Explanation;
use crate::fs::{FileSystem, RealFileSystem};
use crate::recovery::{Interactive, NamedInvocation, RecoveryOutcome, automated_policy};
use crate::remote::{RemoteFront, SshTransport};
use crate::types::{OutputMode, RecoveryMode, WaitMode};

/// High-level entry point used by `main.rs`.
///
/// Loads the config, installs its ambient policy on this thread and runs the
/// selected subcommand. The returned value is the process exit code.
pub fn run(args: CliArgs) -> anyhow::Result<i32> {
    let cfg = load_config(args.config.as_deref())?;

    let _ambient = context::install(cfg.settings.ambient_policy());
    let dispatcher = Dispatcher::system().with_search_paths(cfg.settings.search_paths.clone());

    match args.command {
        Command::Run(run) => run_program(&dispatcher, run),
        Command::Which(which) => which_program(&dispatcher, which),
        Command::Invoke(invoke) => invoke_named(&dispatcher, &cfg, invoke),
        Command::Remote(remote) => run_remote(remote_front(dispatcher, &cfg), remote),
        Command::WatchRemote(remote) => watch_remote(remote_front(dispatcher, &cfg), remote),
    }
}

/// Explicit `--config` must exist; the default path is optional.
fn load_config(explicit: Option<&str>) -> anyhow::Result<ConfigFile> {
    if let Some(path) = explicit {
        return load_and_validate(path)
            .with_context(|| format!("failed to load config from {path}"));
    }

    let default_path = default_config_path();
    if RealFileSystem.is_file(&default_path) {
        debug!(path = %default_path.display(), "using default config file");
        return load_and_validate(&default_path)
            .with_context(|| format!("failed to load config from {}", default_path.display()));
    }

    debug!("no config file; using built-in defaults");
    Ok(ConfigFile::try_from(RawConfigFile::default())?)
}

fn run_program(dispatcher: &Dispatcher, args: RunArgs) -> anyhow::Result<i32> {
    let mut overrides = PolicyOverrides::new();

    if args.dry_run {
        overrides = overrides.dry_run(true);
    }
    if args.verbose {
        overrides = overrides.verbose(true);
    }
    if let Some(text) = args.explain {
        overrides = overrides.explain(Explanation::new(text)).explanatory(true);
    }
    if let Some(output) = args.output {
        overrides = overrides.output(OutputMode::from(output));
    }
    for entry in &args.env {
        if let Err(msg) = validate_entry(entry) {
            bail!("--env {entry}: {msg}");
        }
    }
    if args.replace_env {
        overrides = overrides.env(Environment::new(args.env));
    } else if !args.env.is_empty() {
        overrides = overrides.env_prepend(args.env);
    }
    for code in args.ok {
        overrides = overrides.ok_code(code, true);
    }
    if args.asynchronous {
        overrides = overrides.wait(WaitMode::NonBlocking);
    }

    let mut command = args.command.into_iter();
    let Some(program) = command.next() else {
        bail!("no program given");
    };

    let outcome = dispatcher
        .execute(program, command, &overrides)
        .and_then(|execution| {
            if let Execution::Spawned(handle) = &execution {
                info!(pid = ?handle.id(), "spawned asynchronously; waiting");
            }
            execution.wait()
        });

    finish(outcome.map(|success| success.output))
}

fn which_program(dispatcher: &Dispatcher, args: WhichArgs) -> anyhow::Result<i32> {
    let dispatcher = if args.search_paths.is_empty() {
        dispatcher.clone()
    } else {
        dispatcher
            .clone()
            .with_search_paths(args.search_paths.iter().map(PathBuf::from).collect())
    };

    if args.required {
        let path = dispatcher.require(&args.name)?;
        println!("{}", path.display());
        return Ok(0);
    }

    match dispatcher.which(&args.name) {
        Resolution::Found(path) => {
            println!("{}", path.display());
            Ok(0)
        }
        Resolution::NotFound(not_found) => {
            eprintln!("{not_found}");
            Ok(1)
        }
    }
}

fn invoke_named(
    dispatcher: &Dispatcher,
    cfg: &ConfigFile,
    args: InvokeArgs,
) -> anyhow::Result<i32> {
    let Some(invocation_cfg) = cfg.invocations.get(&args.name) else {
        bail!("no [invocation.{}] in config", args.name);
    };

    let mode = args
        .recovery
        .map(RecoveryMode::from)
        .unwrap_or(invocation_cfg.recovery);
    let invocation = NamedInvocation::from_config(&args.name, invocation_cfg);

    let outcome = match automated_policy(mode, invocation_cfg.max_retries) {
        Some(mut policy) => invocation.run(dispatcher, policy.as_mut()),
        None => {
            let stdin = std::io::stdin();
            let mut policy = Interactive::new(stdin.lock(), std::io::stderr());
            invocation.run(dispatcher, &mut policy)
        }
    };

    finish(outcome.map(|outcome| match outcome {
        RecoveryOutcome::Completed(success) => success.output,
        RecoveryOutcome::Accepted(err) => {
            eprintln!("accepted failure of '{}': {err}", args.name);
            None
        }
    }))
}

fn remote_front(dispatcher: Dispatcher, cfg: &ConfigFile) -> RemoteFront {
    let transport = SshTransport::new(cfg.remote.program.clone())
        .with_options(cfg.remote.options.iter().cloned());
    RemoteFront::new(dispatcher, Arc::new(transport))
}

fn run_remote(front: RemoteFront, args: RemoteArgs) -> anyhow::Result<i32> {
    let outcome = front.run_remote(&args.host, &args.command, &PolicyOverrides::new());
    finish(outcome.map(|success| success.output))
}

fn watch_remote(front: RemoteFront, args: RemoteArgs) -> anyhow::Result<i32> {
    let lines = front.watch_remote(&args.host, &args.command, &PolicyOverrides::new())?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for line in lines {
        match line {
            Ok(line) => writeln!(out, "{line}")?,
            Err(err) => return finish(Err(err)),
        }
    }
    Ok(0)
}

/// Print captured output on success; turn execution failures into the
/// child's exit code and everything else into an error.
fn finish(outcome: Result<Option<OutputBytes>>) -> anyhow::Result<i32> {
    match outcome {
        Ok(output) => {
            if let Some(output) = output {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(output.as_bytes())?;
                stdout.flush()?;
            }
            Ok(0)
        }
        Err(err) => match err.failure() {
            Some(failure) => {
                eprintln!("execward: {err}");
                Ok(if failure.exit_code > 0 { failure.exit_code } else { 1 })
            }
            None => Err(err.into()),
        },
    }
}
