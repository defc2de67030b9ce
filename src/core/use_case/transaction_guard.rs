use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::dispatch::{CallScope, IoDispatcher};
use crate::core::domain::repository_error::RepositoryError;
use crate::core::domain::transaction::{SharedTransaction, TransactionState};
use crate::core::port::repository::RepositoryAdapter;
use crate::core::use_case::async_repository::AsyncRepository;

/// Owns one open transaction for the length of a guarded block.
///
/// The terminal call (commit or rollback) is claimed through an atomic flag,
/// so exactly one of them reaches the backend even when the dispatched call
/// and the destructor race. Before either one runs, the guard closes its
/// call scope and waits for repository calls of the block that are still
/// running on the pool, so no write lands after the transaction ended. A
/// guard dropped before anything was claimed (cancelled future, panicking
/// block) does both synchronously in `drop`.
pub struct TransactionGuard<C: Send + Sync + 'static> {
    context: SharedTransaction<C>,
    state: TransactionState,
    finished: Arc<AtomicBool>,
    calls: CallScope,
}

fn claim(finished: &AtomicBool) -> bool {
    !finished.swap(true, Ordering::SeqCst)
}

impl<C: Send + Sync + 'static> TransactionGuard<C> {
    fn new(context: SharedTransaction<C>) -> Self {
        Self {
            context,
            state: TransactionState::Open,
            finished: Arc::new(AtomicBool::new(false)),
            calls: CallScope::new(),
        }
    }

    /// Handle to pass to `AsyncRepository::execute_in`.
    pub fn context(&self) -> SharedTransaction<C> {
        self.context.clone()
    }

    pub fn connection(&self) -> &C {
        self.context.connection()
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Dispatches the terminal call and records the state it actually
    /// reached: `target` on success, `Failed` when the backend refused it.
    async fn finish(
        &mut self,
        dispatcher: &IoDispatcher,
        target: TransactionState,
    ) -> Result<(), RepositoryError> {
        if self.state.is_terminal() {
            return Err(RepositoryError::Database(format!(
                "transaction already {}",
                self.state
            )));
        }
        let context = self.context.clone();
        let finished = self.finished.clone();
        let calls = self.calls.clone();

        let dispatched = dispatcher
            .dispatch(move || {
                calls.close_and_wait();
                if !claim(&finished) {
                    return Ok(());
                }
                match target {
                    TransactionState::Committed => context.commit(),
                    _ => context.rollback(),
                }
            })
            .await;

        match dispatched {
            Ok(result) => {
                let reached = match result {
                    Ok(()) => target,
                    Err(_) => TransactionState::Failed,
                };
                self.state.transition(reached)?;
                result
            }
            Err(dispatch_error) => {
                // The call may never have reached the worker pool.
                if self.rollback_if_unclaimed() {
                    self.state.transition(TransactionState::RolledBack)?;
                }
                Err(dispatch_error)
            }
        }
    }

    fn rollback_if_unclaimed(&self) -> bool {
        self.calls.close_and_wait();
        if !claim(&self.finished) {
            return false;
        }
        warn!("rolling back on the calling thread");
        if let Err(e) = self.context.rollback() {
            warn!(error = %e, "rollback failed");
        }
        true
    }
}

impl<C: Send + Sync + 'static> Drop for TransactionGuard<C> {
    fn drop(&mut self) {
        if self.finished.load(Ordering::SeqCst) {
            return;
        }
        warn!(
            state = %self.state,
            running_calls = self.calls.running(),
            "transaction scope abandoned"
        );
        if self.rollback_if_unclaimed() {
            self.state = TransactionState::RolledBack;
        }
    }
}

/// Runs `work` inside a fresh transaction of `repository`.
///
/// `work` receives a view of `repository` bound to the new transaction.
/// Commits once if `work` returns `Ok`. Rolls back once if it returns `Err`,
/// panics or is cancelled, and hands the block's own error back unchanged. A
/// failing commit is returned as `E::from(..)` and is not followed by a
/// rollback. Calls the block started are always finished before the commit
/// or rollback runs.
///
/// ```no_run
/// # use tx_adapter::core::use_case::transaction_guard::run_in_transaction;
/// # use tx_adapter::core::domain::repository_error::RepositoryError;
/// # use tx_adapter::adapter::store::memory::repository::MemoryRepository;
/// # use tx_adapter::core::domain::entity::user::User;
/// # use tx_adapter::core::port::repository::RepositoryAdapterExt;
/// # use std::sync::Arc;
/// # async fn demo() -> Result<(), RepositoryError> {
/// let users = Arc::new(MemoryRepository::<User>::new()).into_async();
/// run_in_transaction(&users, |repo, _tx| {
///     Box::pin(async move {
///         repo.insert(User::new(1, "alice", "alice@example.com")).await.into_result()
///     })
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_in_transaction<A, R, E, F>(repository: &AsyncRepository<A>, work: F) -> Result<R, E>
where
    A: RepositoryAdapter,
    E: From<RepositoryError>,
    F: for<'a> FnOnce(
        &'a AsyncRepository<A>,
        &'a TransactionGuard<A::Connection>,
    ) -> BoxFuture<'a, Result<R, E>>,
{
    let context = repository.begin_transaction().await?;
    let mut guard = TransactionGuard::new(context);
    let scoped = repository.bound_to(guard.context(), guard.calls.clone());
    debug!("transaction opened");

    let outcome = work(&scoped, &guard).await;

    match outcome {
        Ok(value) => {
            guard
                .finish(repository.dispatcher(), TransactionState::Committed)
                .await?;
            debug!("transaction committed");
            Ok(value)
        }
        Err(e) => {
            match guard
                .finish(repository.dispatcher(), TransactionState::RolledBack)
                .await
            {
                Ok(()) => debug!("transaction rolled back"),
                Err(rollback_error) => warn!(error = %rollback_error, "rollback failed"),
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::transaction::TransactionContext;
    use std::sync::atomic::AtomicUsize;

    struct Backend {
        commit_error: Option<RepositoryError>,
        rollbacks: AtomicUsize,
    }

    impl TransactionContext<()> for Backend {
        fn connection(&self) -> &() {
            &()
        }

        fn commit(&self) -> Result<(), RepositoryError> {
            match &self.commit_error {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            }
        }

        fn rollback(&self) -> Result<(), RepositoryError> {
            self.rollbacks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn guard(commit_error: Option<RepositoryError>) -> (TransactionGuard<()>, Arc<Backend>) {
        let backend = Arc::new(Backend {
            commit_error,
            rollbacks: AtomicUsize::new(0),
        });
        (TransactionGuard::new(backend.clone()), backend)
    }

    #[tokio::test]
    async fn refused_commit_leaves_the_guard_failed() {
        let (mut guard, backend) = guard(Some(RepositoryError::commit("disk full")));
        let dispatcher = IoDispatcher::default();

        let err = guard
            .finish(&dispatcher, TransactionState::Committed)
            .await
            .unwrap_err();
        assert_eq!(err, RepositoryError::commit("disk full"));
        assert_eq!(guard.state(), TransactionState::Failed);

        drop(guard);
        assert_eq!(backend.rollbacks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn successful_commit_is_recorded_after_the_backend_answers() {
        let (mut guard, _backend) = guard(None);
        let dispatcher = IoDispatcher::default();

        guard
            .finish(&dispatcher, TransactionState::Committed)
            .await
            .unwrap();
        assert_eq!(guard.state(), TransactionState::Committed);
        assert!(guard
            .finish(&dispatcher, TransactionState::RolledBack)
            .await
            .is_err());
        assert_eq!(guard.state(), TransactionState::Committed);
    }

    #[test]
    fn drop_closes_the_call_scope_before_rolling_back() {
        let (guard, backend) = guard(None);
        let calls = guard.calls.clone();
        drop(guard);

        assert!(calls.is_closed());
        assert!(calls.enter().is_err());
        assert_eq!(backend.rollbacks.load(Ordering::SeqCst), 1);
    }
}
