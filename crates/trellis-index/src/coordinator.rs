//! The coordinator capability: the narrow interface through which the indexer
//! reaches the backing analytical database.
//!
//! `exec` submits a batch of SQL statements and returns an [`ExecHandle`] --
//! a promise-like cell the caller can wait on or attach error callbacks to.
//! The indexer itself never blocks on a handle; it stores it on the cube info
//! so that consumers needing the cube ready can wait.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex};

use tracing::error;

/// A failed statement batch.
#[derive(Debug, Clone, thiserror::Error)]
#[error("query execution failed: {message}")]
pub struct ExecError {
    /// Backend-reported failure description.
    pub message: String,
}

impl ExecError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

type ErrorCallback = Box<dyn FnOnce(&ExecError) + Send>;

enum ExecState {
    Pending(Vec<ErrorCallback>),
    Done(Result<(), ExecError>),
}

/// Shared handle to the eventual result of a statement batch.
///
/// Completion may happen on any thread; the handle only ever mutates its own
/// cell. Error callbacks registered before completion run at completion time;
/// callbacks registered after a failed completion run immediately.
#[derive(Clone)]
pub struct ExecHandle {
    inner: Arc<(Mutex<ExecState>, Condvar)>,
}

impl ExecHandle {
    /// A handle whose result is not yet known.
    pub fn pending() -> Self {
        Self {
            inner: Arc::new((Mutex::new(ExecState::Pending(Vec::new())), Condvar::new())),
        }
    }

    /// A handle that already carries its result.
    pub fn resolved(result: Result<(), ExecError>) -> Self {
        Self {
            inner: Arc::new((Mutex::new(ExecState::Done(result)), Condvar::new())),
        }
    }

    /// Records the result. The first completion wins; later calls are
    /// ignored. Error callbacks fire outside the lock.
    pub fn complete(&self, result: Result<(), ExecError>) {
        let (state, cond) = &*self.inner;
        let callbacks = {
            let mut guard = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            match &mut *guard {
                ExecState::Done(_) => return,
                ExecState::Pending(callbacks) => {
                    let callbacks = std::mem::take(callbacks);
                    *guard = ExecState::Done(result.clone());
                    callbacks
                }
            }
        };
        if let Err(err) = &result {
            for callback in callbacks {
                callback(err);
            }
        }
        cond.notify_all();
    }

    /// The result, if the batch has finished.
    pub fn try_result(&self) -> Option<Result<(), ExecError>> {
        let (state, _) = &*self.inner;
        match &*state.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) {
            ExecState::Done(result) => Some(result.clone()),
            ExecState::Pending(_) => None,
        }
    }

    /// Blocks until the batch finishes and returns its result.
    pub fn wait(&self) -> Result<(), ExecError> {
        let (state, cond) = &*self.inner;
        let mut guard = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        loop {
            match &*guard {
                ExecState::Done(result) => return result.clone(),
                ExecState::Pending(_) => {
                    guard = cond
                        .wait(guard)
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                }
            }
        }
    }

    /// Registers a callback invoked with the error if the batch fails (now,
    /// for already-failed handles, or at completion time otherwise).
    pub fn on_error(&self, callback: impl FnOnce(&ExecError) + Send + 'static) {
        let (state, _) = &*self.inner;
        let immediate = {
            let mut guard = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            match &mut *guard {
                ExecState::Pending(callbacks) => {
                    callbacks.push(Box::new(callback));
                    None
                }
                ExecState::Done(Err(err)) => Some((err.clone(), callback)),
                ExecState::Done(Ok(())) => None,
            }
        };
        if let Some((err, callback)) = immediate {
            callback(&err);
        }
    }
}

impl fmt::Debug for ExecHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (state, _) = &*self.inner;
        let label = match state.lock() {
            Ok(guard) => match &*guard {
                ExecState::Pending(_) => "pending",
                ExecState::Done(Ok(())) => "ok",
                ExecState::Done(Err(_)) => "error",
            },
            Err(_) => "poisoned",
        };
        f.debug_struct("ExecHandle").field("state", &label).finish()
    }
}

/// Executes SQL against the backing database and exposes an error sink.
pub trait Coordinator: Send + Sync {
    /// Submits a batch of statements for execution, in order, as one unit.
    fn exec(&self, statements: Vec<String>) -> ExecHandle;

    /// Structured error sink for asynchronous failures.
    fn log_error(&self, error: &ExecError) {
        error!(%error, "cube materialization failed");
    }
}
