// src/exec/trace.rs

//! Human-readable trace of what the dispatcher is about to do.
//!
//! Separate from logging: these lines go to a designated channel (stderr by
//! default) because they are user-facing in dry-run and verbose modes. Each
//! line is also mirrored at `debug` level.

use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::exec::policy::{ExecutionPolicy, SharedWriter};

#[derive(Clone)]
pub struct TraceChannel {
    writer: SharedWriter,
}

impl TraceChannel {
    pub fn stderr() -> Self {
        Self {
            writer: Arc::new(Mutex::new(io::stderr())),
        }
    }

    pub fn to_writer(writer: SharedWriter) -> Self {
        Self { writer }
    }

    pub fn explanation(&self, text: &str) {
        self.emit(format!("# {text}"));
    }

    /// One line: program, arguments, environment, output and wait mode.
    pub fn invocation(&self, program: &Path, arguments: &[String], policy: &ExecutionPolicy) {
        let dry = if policy.flags().dry_run { " (dry run)" } else { "" };
        self.emit(format!(
            "$ {} {:?} env={} output={} wait={}{}",
            program.display(),
            arguments,
            policy.environment(),
            policy.output().label(),
            policy.wait(),
            dry
        ));
    }

    fn emit(&self, line: String) {
        debug!(target: "execward::trace", "{line}");
        match self.writer.lock() {
            Ok(mut w) => {
                if let Err(e) = writeln!(w, "{line}") {
                    warn!(error = %e, "failed to write trace line");
                }
            }
            Err(_) => warn!("trace writer lock poisoned; dropping trace line"),
        }
    }
}

impl Default for TraceChannel {
    fn default() -> Self {
        TraceChannel::stderr()
    }
}

impl fmt::Debug for TraceChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TraceChannel")
    }
}
