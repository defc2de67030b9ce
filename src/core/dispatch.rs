use std::sync::{Arc, Condvar, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::trace;

use crate::core::domain::repository_error::RepositoryError;

pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Upper bound on blocking repository calls running at the same time.
    pub max_in_flight: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

/// Runs blocking repository calls on tokio's blocking pool.
///
/// Cloning is cheap and every clone shares the same bound.
#[derive(Debug, Clone)]
pub struct IoDispatcher {
    permits: Arc<Semaphore>,
    max_in_flight: usize,
}

impl IoDispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        let max_in_flight = config.max_in_flight.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Stops accepting new calls. Calls already running finish normally.
    pub fn shutdown(&self) {
        self.permits.close();
    }

    /// Suspends the caller until `call` has run on the blocking pool.
    pub async fn dispatch<F, R>(&self, call: F) -> Result<R, RepositoryError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let handle = Handle::try_current()
            .map_err(|e| RepositoryError::dispatch(format!("no async runtime: {e}")))?;

        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| RepositoryError::dispatch("I/O dispatcher is shut down"))?;

        trace!(
            available = self.permits.available_permits(),
            "dispatching blocking repository call"
        );

        handle
            .spawn_blocking(move || {
                let _permit = permit;
                call()
            })
            .await
            .map_err(|e| {
                if e.is_panic() {
                    RepositoryError::dispatch("repository call panicked")
                } else {
                    RepositoryError::dispatch(format!("repository call cancelled: {e}"))
                }
            })
    }
}

impl Default for IoDispatcher {
    fn default() -> Self {
        Self::new(DispatcherConfig::default())
    }
}

#[derive(Debug, Default)]
struct ScopeState {
    running: usize,
    closed: bool,
}

/// Counts the blocking calls running on behalf of one transaction scope.
///
/// A closed scope refuses calls that have not started yet, and
/// `close_and_wait` returns only once the running ones are done. Calls still
/// queued for a permit or a pool thread are not counted, so closing never
/// waits on work that cannot make progress.
#[derive(Debug, Clone, Default)]
pub struct CallScope {
    inner: Arc<(Mutex<ScopeState>, Condvar)>,
}

impl CallScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a call that is about to run. Dropping the entry marks it done.
    pub fn enter(&self) -> Result<ScopeEntry, RepositoryError> {
        let (state, _) = &*self.inner;
        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return Err(RepositoryError::dispatch("transaction scope already closed"));
        }
        state.running += 1;
        Ok(ScopeEntry {
            scope: self.clone(),
        })
    }

    /// Blocks the current thread until the running calls are done.
    pub fn close_and_wait(&self) {
        let (state, done) = &*self.inner;
        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
        state.closed = true;
        if state.running > 0 {
            trace!(running = state.running, "waiting for in-flight calls");
        }
        while state.running > 0 {
            state = done.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn running(&self) -> usize {
        let (state, _) = &*self.inner;
        state.lock().unwrap_or_else(PoisonError::into_inner).running
    }

    pub fn is_closed(&self) -> bool {
        let (state, _) = &*self.inner;
        state.lock().unwrap_or_else(PoisonError::into_inner).closed
    }
}

/// A call registered with a [`CallScope`].
#[derive(Debug)]
pub struct ScopeEntry {
    scope: CallScope,
}

impl Drop for ScopeEntry {
    fn drop(&mut self) {
        let (state, done) = &*self.scope.inner;
        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
        state.running = state.running.saturating_sub(1);
        done.notify_all();
    }
}
