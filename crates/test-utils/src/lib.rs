pub mod builders;
pub mod spy_spawner;

use std::io::{self, Write};
use std::sync::{Arc, Mutex, Once};

use execward::exec::{Dispatcher, SharedWriter, TraceChannel};
use execward::fs::mock::MockFileSystem;
use execward::registry::ExecutableRegistry;
use tracing_subscriber::{fmt, EnvFilter};

pub use spy_spawner::{ScriptedRun, SpySpawner};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// In-memory `Write` sink that can be shared with the dispatcher and read
/// back afterwards.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writer(&self) -> SharedWriter {
        Arc::new(Mutex::new(self.clone()))
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock().unwrap()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Everything a dispatcher test needs to look at afterwards.
pub struct Harness {
    pub dispatcher: Dispatcher,
    pub spawner: SpySpawner,
    pub fs: MockFileSystem,
    pub trace: SharedBuffer,
}

impl Harness {
    /// Dispatcher over an in-memory filesystem and a spy spawner, tracing
    /// into a buffer. The search path is `/usr/bin`, `/bin`.
    pub fn new() -> Self {
        init_tracing();

        let fs = MockFileSystem::new();
        let spawner = SpySpawner::new();
        let trace = SharedBuffer::new();

        let registry = Arc::new(ExecutableRegistry::new(Arc::new(fs.clone())));
        let dispatcher = Dispatcher::new(registry, Arc::new(spawner.clone()))
            .with_trace(TraceChannel::to_writer(trace.writer()));

        Self {
            dispatcher,
            spawner,
            fs,
            trace,
        }
    }

    /// Make `name` resolvable under `dir`.
    pub fn install(&self, dir: &str, name: &str) -> std::path::PathBuf {
        let path = std::path::Path::new(dir).join(format!("{name}{}", std::env::consts::EXE_SUFFIX));
        self.fs.add_file(&path, Vec::new());
        path
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
