// src/context.rs

//! Dynamically scoped execution settings.
//!
//! Each thread has its own ambient [`ExecutionPolicy`]. A scope layers a
//! [`PolicyOverrides`] on top of it for the lifetime of a [`ScopeGuard`];
//! dropping the guard restores the exact previous policy, including when the
//! scoped work returns an error or panics, and when guards are dropped out of
//! order. Settings never leak across
//! threads: a freshly spawned thread starts from the default policy.
//!
//! ```no_run
//! use execward::context;
//! use execward::exec::{Dispatcher, PolicyOverrides};
//!
//! let dispatcher = Dispatcher::system();
//! let out = context::dry_run(|| {
//!     context::capturing(|| dispatcher.run("make", ["install"], &PolicyOverrides::new()))
//! });
//! assert!(out.is_ok());
//! ```

use std::cell::RefCell;
use std::marker::PhantomData;
use std::path::PathBuf;

use tracing::trace;

use crate::exec::environment::Environment;
use crate::exec::policy::{ExecutionPolicy, Explanation, InputSource, OutputSink, PolicyOverrides};
use crate::exec::tables::{ErrorTranslationTable, ExitCodeTable};
use crate::types::WaitMode;

thread_local! {
    static SCOPES: RefCell<ScopeStack> = RefCell::new(ScopeStack::default());
}

/// Base policy plus one frame per open scope; the top frame is in effect.
#[derive(Default)]
struct ScopeStack {
    base: ExecutionPolicy,
    frames: Vec<Frame>,
    next_id: u64,
}

struct Frame {
    id: u64,
    policy: ExecutionPolicy,
}

impl ScopeStack {
    fn top(&self) -> &ExecutionPolicy {
        self.frames.last().map_or(&self.base, |f| &f.policy)
    }

    fn push(&mut self, policy: ExecutionPolicy) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.frames.push(Frame { id, policy });
        id
    }

    /// Close frame `id` and every frame opened after it. A frame that is
    /// already gone is left alone, so later scopes are never cut short.
    fn close(&mut self, id: u64) -> usize {
        match self.frames.iter().position(|f| f.id == id) {
            Some(pos) => {
                let closed = self.frames.len() - pos;
                self.frames.truncate(pos);
                closed
            }
            None => 0,
        }
    }
}

/// Current ambient policy of this thread.
pub fn current() -> ExecutionPolicy {
    SCOPES.with(|s| s.borrow().top().clone())
}

/// Ambient policy merged with call-site overrides.
pub fn snapshot(overrides: &PolicyOverrides) -> ExecutionPolicy {
    SCOPES.with(|s| s.borrow().top().merged(overrides))
}

/// Closes its scope when dropped.
///
/// Guards may be dropped in any order. Dropping one closes its own scope
/// together with every scope entered after it, so the policy in effect is
/// always the one from before the outermost closed scope.
///
/// Not `Send`: it must be dropped on the thread whose context it changed.
#[must_use = "the scope ends as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ScopeGuard {
    id: u64,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        let closed = SCOPES
            .try_with(|s| s.borrow_mut().close(self.id))
            .unwrap_or(0);
        match closed {
            0 => trace!(id = self.id, "policy scope already closed"),
            1 => trace!(id = self.id, "policy scope restored"),
            n => trace!(id = self.id, nested = n - 1, "policy scope closed with nested scopes"),
        }
    }
}

/// Replace the ambient policy outright (e.g. with one built from config).
pub fn install(policy: ExecutionPolicy) -> ScopeGuard {
    let id = SCOPES.with(|s| s.borrow_mut().push(policy));
    ScopeGuard {
        id,
        _not_send: PhantomData,
    }
}

/// Layer `overrides` on the ambient policy until the guard drops.
pub fn enter(overrides: &PolicyOverrides) -> ScopeGuard {
    let next = snapshot(overrides);
    trace!(?overrides, "entering policy scope");
    install(next)
}

/// Run `f` with `overrides` in effect.
pub fn scoped<T>(overrides: PolicyOverrides, f: impl FnOnce() -> T) -> T {
    let _guard = enter(&overrides);
    f()
}

pub fn dry_run<T>(f: impl FnOnce() -> T) -> T {
    scoped(PolicyOverrides::new().dry_run(true), f)
}

pub fn verbose<T>(f: impl FnOnce() -> T) -> T {
    scoped(PolicyOverrides::new().verbose(true), f)
}

pub fn explanatory<T>(f: impl FnOnce() -> T) -> T {
    scoped(PolicyOverrides::new().explanatory(true), f)
}

pub fn explaining<T>(explanation: Explanation, f: impl FnOnce() -> T) -> T {
    scoped(PolicyOverrides::new().explain(explanation), f)
}

pub fn with_output<T>(output: impl Into<OutputSink>, f: impl FnOnce() -> T) -> T {
    scoped(PolicyOverrides::new().output(output), f)
}

/// Output-direction scope with its default direction.
pub fn capturing<T>(f: impl FnOnce() -> T) -> T {
    with_output(OutputSink::Capture, f)
}

pub fn with_input<T>(input: InputSource, f: impl FnOnce() -> T) -> T {
    scoped(PolicyOverrides::new().input(input), f)
}

pub fn with_input_file<T>(path: impl Into<PathBuf>, f: impl FnOnce() -> T) -> T {
    with_input(InputSource::File(path.into()), f)
}

/// Replace the environment for the scope.
pub fn with_environment<T>(environment: Environment, f: impl FnOnce() -> T) -> T {
    scoped(PolicyOverrides::new().env(environment), f)
}

/// Shadow entries of the current environment for the scope.
pub fn with_environment_prepended<I, S, T>(entries: I, f: impl FnOnce() -> T) -> T
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    scoped(PolicyOverrides::new().env_prepend(entries), f)
}

pub fn with_exit_codes<T>(table: ExitCodeTable, f: impl FnOnce() -> T) -> T {
    scoped(PolicyOverrides::new().exit_codes(table), f)
}

pub fn with_translations<T>(table: ErrorTranslationTable, f: impl FnOnce() -> T) -> T {
    scoped(PolicyOverrides::new().translations(table), f)
}

pub fn asynchronously<T>(f: impl FnOnce() -> T) -> T {
    scoped(PolicyOverrides::new().wait(WaitMode::NonBlocking), f)
}

pub fn synchronously<T>(f: impl FnOnce() -> T) -> T {
    scoped(PolicyOverrides::new().wait(WaitMode::Blocking), f)
}
