// src/exec/spawn.rs

//! Platform spawn primitive.
//!
//! The dispatcher never touches `std::process` directly; it hands a
//! [`SpawnRequest`] to a [`Spawner`]. Production code uses [`StdSpawner`];
//! tests substitute a spy that records requests and scripts exit codes.

use std::fmt::Debug;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use tracing::debug;

use crate::exec::policy::InputSource;

/// How the child's stdout is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdoutTarget {
    Null,
    Inherit,
    Piped,
}

/// Fully resolved request handed to the platform layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    pub program: PathBuf,
    pub arguments: Vec<String>,
    /// The complete child environment; nothing is inherited.
    pub environment: Vec<(String, String)>,
    pub stdin: InputSource,
    pub stdout: StdoutTarget,
}

/// A spawned child process.
pub trait ChildProcess: Send + Debug {
    fn id(&self) -> Option<u32>;

    /// The read end of a piped stdout; `None` after the first call or when
    /// stdout was not piped.
    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>>;

    /// Non-blocking poll for the exit code.
    fn try_wait(&mut self) -> io::Result<Option<i32>>;

    /// Block until exit and return the exit code.
    fn wait(&mut self) -> io::Result<i32>;

    fn kill(&mut self) -> io::Result<()>;
}

/// Creates child processes.
pub trait Spawner: Send + Sync + Debug {
    fn spawn(&self, request: SpawnRequest) -> io::Result<Box<dyn ChildProcess>>;
}

/// `std::process` backed spawner.
#[derive(Debug, Clone, Default)]
pub struct StdSpawner;

impl Spawner for StdSpawner {
    fn spawn(&self, request: SpawnRequest) -> io::Result<Box<dyn ChildProcess>> {
        let stdin = match &request.stdin {
            InputSource::Null => Stdio::null(),
            InputSource::Inherit => Stdio::inherit(),
            InputSource::File(path) => Stdio::from(File::open(path)?),
        };
        let stdout = match request.stdout {
            StdoutTarget::Null => Stdio::null(),
            StdoutTarget::Inherit => Stdio::inherit(),
            StdoutTarget::Piped => Stdio::piped(),
        };

        let child = Command::new(&request.program)
            .args(&request.arguments)
            .env_clear()
            .envs(request.environment.iter().map(|(k, v)| (k, v)))
            .stdin(stdin)
            .stdout(stdout)
            .stderr(Stdio::inherit())
            .spawn()?;

        debug!(pid = child.id(), program = %request.program.display(), "child spawned");
        Ok(Box::new(StdChild { child }))
    }
}

#[derive(Debug)]
struct StdChild {
    child: Child,
}

impl ChildProcess for StdChild {
    fn id(&self) -> Option<u32> {
        Some(self.child.id())
    }

    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>> {
        self.child
            .stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn Read + Send>)
    }

    fn try_wait(&mut self) -> io::Result<Option<i32>> {
        Ok(self.child.try_wait()?.map(|status| status.code().unwrap_or(-1)))
    }

    fn wait(&mut self) -> io::Result<i32> {
        // Signal deaths carry no code.
        Ok(self.child.wait()?.code().unwrap_or(-1))
    }

    fn kill(&mut self) -> io::Result<()> {
        self.child.kill()
    }
}
