use std::collections::VecDeque;
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use execward::exec::{ChildProcess, SpawnRequest, Spawner, StdoutTarget};

/// What one fake child does: print `stdout`, then exit with `exit_code`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptedRun {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
}

impl ScriptedRun {
    pub fn exit(exit_code: i32) -> Self {
        Self {
            exit_code,
            stdout: Vec::new(),
        }
    }

    pub fn output(exit_code: i32, stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
        }
    }
}

#[derive(Debug, Default)]
struct SpyState {
    requests: Vec<SpawnRequest>,
    script: VecDeque<ScriptedRun>,
    fallback: ScriptedRun,
    refuse: Option<io::ErrorKind>,
    kills: usize,
    reaps: usize,
}

/// A fake spawner that:
/// - records every `SpawnRequest` it receives
/// - hands out fake children following a script (then a fallback run)
///
/// Clones share state, so a test keeps one clone and gives the other to the
/// dispatcher.
#[derive(Debug, Clone, Default)]
pub struct SpySpawner {
    state: Arc<Mutex<SpyState>>,
}

static NEXT_PID: AtomicU32 = AtomicU32::new(40_000);

impl SpySpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next child's behaviour.
    pub fn then(self, run: ScriptedRun) -> Self {
        self.state.lock().unwrap().script.push_back(run);
        self
    }

    pub fn then_exit(self, exit_code: i32) -> Self {
        self.then(ScriptedRun::exit(exit_code))
    }

    pub fn then_output(self, exit_code: i32, stdout: impl Into<Vec<u8>>) -> Self {
        self.then(ScriptedRun::output(exit_code, stdout))
    }

    /// Behaviour once the script is used up (default: exit 0, no output).
    pub fn otherwise(self, run: ScriptedRun) -> Self {
        self.state.lock().unwrap().fallback = run;
        self
    }

    /// Make every spawn fail with `kind`, as if the program did not exist.
    pub fn refusing(self, kind: io::ErrorKind) -> Self {
        self.state.lock().unwrap().refuse = Some(kind);
        self
    }

    pub fn requests(&self) -> Vec<SpawnRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn spawn_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    pub fn last_request(&self) -> Option<SpawnRequest> {
        self.state.lock().unwrap().requests.last().cloned()
    }

    /// How many children were killed.
    pub fn kill_count(&self) -> usize {
        self.state.lock().unwrap().kills
    }

    /// How many blocking waits the children served.
    pub fn reap_count(&self) -> usize {
        self.state.lock().unwrap().reaps
    }
}

impl Spawner for SpySpawner {
    fn spawn(&self, request: SpawnRequest) -> io::Result<Box<dyn ChildProcess>> {
        let mut state = self.state.lock().unwrap();
        let piped = request.stdout == StdoutTarget::Piped;
        state.requests.push(request);

        if let Some(kind) = state.refuse {
            return Err(io::Error::new(kind, "spawn refused by SpySpawner"));
        }

        let run = state
            .script
            .pop_front()
            .unwrap_or_else(|| state.fallback.clone());

        Ok(Box::new(FakeChild {
            pid: NEXT_PID.fetch_add(1, Ordering::Relaxed),
            stdout: piped.then(|| Cursor::new(run.stdout)),
            exit_code: run.exit_code,
            killed: false,
            spy: Arc::clone(&self.state),
        }))
    }
}

/// Child that has already "run": its output is buffered and its exit code
/// fixed. Killing it turns the exit code into -1, like a signal death.
#[derive(Debug)]
pub struct FakeChild {
    pid: u32,
    stdout: Option<Cursor<Vec<u8>>>,
    exit_code: i32,
    killed: bool,
    spy: Arc<Mutex<SpyState>>,
}

impl FakeChild {
    fn status(&self) -> i32 {
        if self.killed { -1 } else { self.exit_code }
    }
}

impl ChildProcess for FakeChild {
    fn id(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>> {
        self.stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn Read + Send>)
    }

    fn try_wait(&mut self) -> io::Result<Option<i32>> {
        Ok(Some(self.status()))
    }

    fn wait(&mut self) -> io::Result<i32> {
        self.spy.lock().unwrap().reaps += 1;
        Ok(self.status())
    }

    fn kill(&mut self) -> io::Result<()> {
        self.killed = true;
        self.spy.lock().unwrap().kills += 1;
        Ok(())
    }
}
