// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! The binary is a thin shell over the library: every subcommand maps onto
//! one library entry point (dispatcher, registry, recovery frontend or
//! remote front).

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::types::{OutputMode, RecoveryMode};

/// Command-line arguments for `execward`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "execward",
    version,
    about = "Run external programs with typed exit-code mapping, scoped policy and recovery.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Execward.toml` in the current working directory, if present.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `EXECWARD_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run a program through the dispatcher.
    Run(RunArgs),

    /// Look up an executable on the search path.
    Which(WhichArgs),

    /// Run a configured `[invocation.<name>]` with recovery.
    Invoke(InvokeArgs),

    /// Run a command on a remote host and wait for it.
    Remote(RemoteArgs),

    /// Stream a remote command's output line by line.
    WatchRemote(RemoteArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Print the invocation instead of running it.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the invocation line before running.
    #[arg(long)]
    pub verbose: bool,

    /// Explanation printed before the invocation.
    #[arg(long, value_name = "TEXT")]
    pub explain: Option<String>,

    /// Where the child's stdout goes. Defaults to the configured mode.
    #[arg(long, value_enum, value_name = "MODE")]
    pub output: Option<OutputArg>,

    /// Extra `KEY=VALUE` entries shadowing the environment.
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// Use only the `--env` entries as the environment.
    #[arg(long)]
    pub replace_env: bool,

    /// Additional exit codes treated as success.
    #[arg(long = "ok", value_name = "CODE", allow_hyphen_values = true)]
    pub ok: Vec<i32>,

    /// Spawn without blocking, then wait on the handle.
    #[arg(long = "async")]
    pub asynchronous: bool,

    /// Program followed by its arguments.
    #[arg(required = true, last = true, value_name = "PROGRAM")]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct WhichArgs {
    pub name: String,

    /// Search directory; repeatable. Replaces the configured search path.
    #[arg(long = "search-path", value_name = "DIR")]
    pub search_paths: Vec<String>,

    /// Treat "not found" as an error.
    #[arg(long)]
    pub required: bool,
}

#[derive(Debug, Clone, Args)]
pub struct InvokeArgs {
    pub name: String,

    /// Override the configured recovery mode.
    #[arg(long, value_enum, value_name = "MODE")]
    pub recovery: Option<RecoveryArg>,
}

#[derive(Debug, Clone, Args)]
pub struct RemoteArgs {
    pub host: String,

    /// Remote command and its arguments.
    #[arg(required = true, last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum OutputArg {
    Inherit,
    Discard,
    Capture,
}

impl From<OutputArg> for OutputMode {
    fn from(arg: OutputArg) -> Self {
        match arg {
            OutputArg::Inherit => OutputMode::Inherit,
            OutputArg::Discard => OutputMode::Discard,
            OutputArg::Capture => OutputMode::Capture,
        }
    }
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum RecoveryArg {
    Fail,
    Accept,
    Retry,
    Interactive,
}

impl From<RecoveryArg> for RecoveryMode {
    fn from(arg: RecoveryArg) -> Self {
        match arg {
            RecoveryArg::Fail => RecoveryMode::Fail,
            RecoveryArg::Accept => RecoveryMode::Accept,
            RecoveryArg::Retry => RecoveryMode::Retry,
            RecoveryArg::Interactive => RecoveryMode::Interactive,
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_collects_trailing_command() {
        let args = CliArgs::try_parse_from([
            "execward", "run", "--ok", "1", "--env", "A=1", "--", "grep", "-q", "x",
        ])
        .unwrap();
        let Command::Run(run) = args.command else {
            panic!("expected run");
        };
        assert_eq!(run.ok, vec![1]);
        assert_eq!(run.env, vec!["A=1".to_string()]);
        assert_eq!(run.command, vec!["grep", "-q", "x"]);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = CliArgs::try_parse_from([
            "execward", "which", "ls", "--config", "x.toml", "--log-level", "debug",
        ])
        .unwrap();
        assert_eq!(args.config.as_deref(), Some("x.toml"));
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    }
}
