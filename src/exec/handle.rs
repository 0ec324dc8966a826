// src/exec/handle.rs

//! Handle to a spawned (or rehearsed) invocation.
//!
//! In non-blocking mode the dispatcher returns a [`ProcessHandle`] right after
//! spawning. The holder owns the child and its stdout pipe and must reap it
//! with [`ProcessHandle::wait`], which maps the exit code exactly like the
//! blocking path does.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::errors::{ExecError, Result};
use crate::exec::outcome::{map_exit_code, OutputBytes, Success};
use crate::exec::policy::OutputSink;
use crate::exec::spawn::ChildProcess;
use crate::exec::tables::{ErrorTranslationTable, ExitCodeTable};

/// What is needed to turn an exit code into an outcome once the child exits.
#[derive(Debug, Clone)]
pub(crate) struct Invocation {
    pub program: PathBuf,
    pub arguments: Vec<String>,
    pub valid_exit_codes: ExitCodeTable,
    pub translations: ErrorTranslationTable,
    pub output: OutputSink,
}

impl Invocation {
    fn map(&self, exit_code: i32, output: Option<OutputBytes>) -> Result<Success> {
        map_exit_code(
            &self.valid_exit_codes,
            &self.translations,
            self.program.clone(),
            self.arguments.clone(),
            exit_code,
            output,
        )
    }
}

#[derive(Debug)]
enum HandleState {
    Live {
        child: Box<dyn ChildProcess>,
        invocation: Invocation,
    },
    /// Dry run: nothing was spawned.
    Rehearsal(Success),
}

#[derive(Debug)]
pub struct ProcessHandle {
    state: HandleState,
}

impl ProcessHandle {
    pub(crate) fn live(child: Box<dyn ChildProcess>, invocation: Invocation) -> Self {
        Self {
            state: HandleState::Live { child, invocation },
        }
    }

    pub(crate) fn rehearsal(success: Success) -> Self {
        Self {
            state: HandleState::Rehearsal(success),
        }
    }

    /// OS process id; `None` for a rehearsal.
    pub fn id(&self) -> Option<u32> {
        match &self.state {
            HandleState::Live { child, .. } => child.id(),
            HandleState::Rehearsal(_) => None,
        }
    }

    pub fn is_rehearsal(&self) -> bool {
        matches!(self.state, HandleState::Rehearsal(_))
    }

    /// Poll without blocking. The exit code is still mapped by `wait`.
    pub fn has_exited(&mut self) -> Result<bool> {
        match &mut self.state {
            HandleState::Live { child, .. } => Ok(child.try_wait()?.is_some()),
            HandleState::Rehearsal(_) => Ok(true),
        }
    }

    pub fn kill(&mut self) -> Result<()> {
        if let HandleState::Live { child, invocation } = &mut self.state {
            info!(program = %invocation.program.display(), pid = child.id(), "killing child process");
            child.kill()?;
        }
        Ok(())
    }

    /// Reap the child and map its exit code.
    ///
    /// Captured output is drained before waiting so a chatty child cannot
    /// block on a full pipe.
    pub fn wait(self) -> Result<Success> {
        let (mut child, invocation) = match self.state {
            HandleState::Live { child, invocation } => (child, invocation),
            HandleState::Rehearsal(success) => return Ok(success),
        };

        let output = match &invocation.output {
            OutputSink::Capture => {
                let mut buf = Vec::new();
                if let Some(mut stdout) = child.take_stdout() {
                    stdout.read_to_end(&mut buf)?;
                }
                Some(OutputBytes::from(buf))
            }
            OutputSink::Writer(writer) => {
                if let Some(mut stdout) = child.take_stdout() {
                    let mut guard = writer
                        .lock()
                        .map_err(|_| io::Error::other("output writer lock poisoned"))?;
                    io::copy(&mut stdout, &mut *guard)?;
                    guard.flush()?;
                }
                None
            }
            OutputSink::Inherit | OutputSink::Discard => None,
        };

        let exit_code = child.wait()?;
        info!(
            program = %invocation.program.display(),
            exit_code,
            "child process exited"
        );

        let outcome = invocation.map(exit_code, output);
        if let Err(err) = &outcome {
            warn!(error = %err, "invocation failed");
        }
        outcome
    }

    /// Stream captured stdout line by line.
    ///
    /// Requires capture mode. After the last line the child is reaped; a
    /// failing exit code is yielded once as the final item.
    pub fn into_lines(self) -> Result<OutputLines> {
        match self.state {
            HandleState::Rehearsal(_) => Ok(OutputLines {
                reader: None,
                child: None,
                collected: OutputBytes::default(),
                done: false,
            }),
            HandleState::Live { mut child, invocation } => {
                if !invocation.output.is_capture() {
                    return Err(ExecError::InvalidOutputSink(format!(
                        "line streaming needs capture mode, not {}",
                        invocation.output.label()
                    )));
                }
                let reader = child.take_stdout().map(BufReader::new);
                Ok(OutputLines {
                    reader,
                    child: Some((child, invocation)),
                    collected: OutputBytes::default(),
                    done: false,
                })
            }
        }
    }
}

/// Finite, non-restartable sequence of output lines (without newlines).
///
/// A line that is not valid UTF-8 is yielded as an `InvalidData` error and
/// iteration continues; the raw bytes still reach the captured output of a
/// final failure. Dropping the sequence before it ends kills and reaps the
/// child.
pub struct OutputLines {
    reader: Option<BufReader<Box<dyn Read + Send>>>,
    child: Option<(Box<dyn ChildProcess>, Invocation)>,
    collected: OutputBytes,
    done: bool,
}

impl std::fmt::Debug for OutputLines {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputLines")
            .field("child", &self.child)
            .field("collected_bytes", &self.collected.len())
            .field("done", &self.done)
            .finish()
    }
}

impl OutputLines {
    fn finish(&mut self) -> Option<Result<String>> {
        self.done = true;
        self.reader = None;
        let (mut child, invocation) = self.child.take()?;

        let exit_code = match child.wait() {
            Ok(code) => code,
            Err(e) => return Some(Err(e.into())),
        };
        debug!(program = %invocation.program.display(), exit_code, "streamed child exited");

        let output = std::mem::take(&mut self.collected);
        match invocation.map(exit_code, Some(output)) {
            Ok(_) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

impl Iterator for OutputLines {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let Some(reader) = self.reader.as_mut() else {
            return self.finish();
        };

        let mut line = Vec::new();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => self.finish(),
            Ok(_) => {
                self.collected.extend_from_slice(&line);
                let trimmed = line
                    .strip_suffix(b"\n")
                    .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
                    .unwrap_or(&line[..]);
                Some(
                    String::from_utf8(trimmed.to_vec())
                        .map_err(|e| ExecError::from(io::Error::new(io::ErrorKind::InvalidData, e))),
                )
            }
            Err(e) => {
                self.done = true;
                Some(Err(e.into()))
            }
        }
    }
}

impl Drop for OutputLines {
    fn drop(&mut self) {
        self.reader = None;
        if let Some((mut child, invocation)) = self.child.take() {
            debug!(
                program = %invocation.program.display(),
                "line stream dropped early; killing child"
            );
            if let Err(e) = child.kill() {
                warn!(error = %e, "failed to kill abandoned child");
            }
            if let Err(e) = child.wait() {
                warn!(error = %e, "failed to reap abandoned child");
            }
        }
    }
}
