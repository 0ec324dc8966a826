// src/remote.rs

//! Remote execution front.
//!
//! Builds a local command line (transport program, host, quoted remote
//! command) and runs it through the [`Dispatcher`], so remote calls get the
//! same exit-code mapping, capture and dry-run behaviour as local ones.
//! Quoting belongs to the [`RemoteTransport`]; the front only assembles and
//! dispatches.

use std::borrow::Cow;
use std::fmt::Debug;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::debug;

use crate::errors::Result;
use crate::exec::dispatcher::{CommandLine, Dispatcher};
use crate::exec::handle::OutputLines;
use crate::exec::outcome::Success;
use crate::exec::policy::{OutputSink, PolicyOverrides};

/// Turns `(host, command)` into a locally runnable command line.
pub trait RemoteTransport: Send + Sync + Debug {
    /// Quote a command so the remote shell sees the original tokens.
    fn quote_for_remote_shell(&self, command: &[String]) -> String;

    fn command_line(&self, host: &str, command: &[String]) -> CommandLine;
}

/// Lines streamed from a watched remote command.
pub type RemoteLines = OutputLines;

/// `ssh [options...] -- host 'quoted command'`.
///
/// The `--` ends option parsing, so a host such as `-oProxyCommand=...` is
/// taken as a destination and never as an ssh option.
#[derive(Debug, Clone)]
pub struct SshTransport {
    program: String,
    options: Vec<String>,
}

impl SshTransport {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            options: Vec::new(),
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.extend(options.into_iter().map(Into::into));
        self
    }
}

impl Default for SshTransport {
    fn default() -> Self {
        SshTransport::new("ssh")
    }
}

impl RemoteTransport for SshTransport {
    fn quote_for_remote_shell(&self, command: &[String]) -> String {
        command
            .iter()
            .map(|t| shell_quote(t))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command_line(&self, host: &str, command: &[String]) -> CommandLine {
        let mut line = CommandLine::new(self.program.clone());
        line.arguments.extend(self.options.iter().cloned());
        line.arguments.push("--".to_string());
        line.arguments.push(host.to_string());
        line.arguments.push(self.quote_for_remote_shell(command));
        line
    }
}

static SHELL_SAFE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_@%+=:,./-]+$").expect("static shell-safe pattern")
});

/// POSIX single-quote a token unless it only has shell-safe characters.
pub fn shell_quote(token: &str) -> Cow<'_, str> {
    if token.is_empty() {
        return Cow::Borrowed("''");
    }
    if SHELL_SAFE.is_match(token) {
        return Cow::Borrowed(token);
    }
    Cow::Owned(format!("'{}'", token.replace('\'', r#"'"'"'"#)))
}

#[derive(Debug, Clone)]
pub struct RemoteFront {
    dispatcher: Dispatcher,
    transport: Arc<dyn RemoteTransport>,
}

impl RemoteFront {
    pub fn new(dispatcher: Dispatcher, transport: Arc<dyn RemoteTransport>) -> Self {
        Self {
            dispatcher,
            transport,
        }
    }

    pub fn command_line<S: AsRef<str>>(&self, host: &str, command: &[S]) -> CommandLine {
        let command: Vec<String> = command.iter().map(|s| s.as_ref().to_string()).collect();
        self.transport.command_line(host, &command)
    }

    /// Run `command` on `host` and wait for it.
    pub fn run_remote<S: AsRef<str>>(
        &self,
        host: &str,
        command: &[S],
        overrides: &PolicyOverrides,
    ) -> Result<Success> {
        let line = self.command_line(host, command);
        debug!(host, program = %line.program, "running remote command");
        self.dispatcher.run(line, Vec::<String>::new(), overrides)
    }

    /// Stream the remote command's stdout line by line.
    ///
    /// Output is forced to capture mode. The sequence ends when the remote
    /// command exits; a failing exit code is yielded as the last item.
    pub fn watch_remote<S: AsRef<str>>(
        &self,
        host: &str,
        command: &[S],
        overrides: &PolicyOverrides,
    ) -> Result<RemoteLines> {
        let line = self.command_line(host, command);
        debug!(host, program = %line.program, "watching remote command");
        let overrides = overrides.clone().output(OutputSink::Capture);
        self.dispatcher
            .spawn(line, Vec::<String>::new(), &overrides)?
            .into_lines()
    }
}
