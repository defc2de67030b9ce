use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};

use crate::core::domain::repository_error::RepositoryError;
use crate::core::domain::transaction_result::TransactionResult;
use crate::core::port::session::DatabaseSession;

/// Runs `work` against `session` and settles the session afterwards.
///
/// Every exit path ends in a `TransactionResult`: an `Err` from `work`, a
/// panic inside it, or a rejected commit all end in a rollback and a `Failure`.
pub async fn run_guarded<S, R, F>(session: &mut S, work: F) -> TransactionResult<R>
where
    S: DatabaseSession,
    F: for<'a> FnOnce(&'a mut S) -> BoxFuture<'a, Result<R, RepositoryError>>,
{
    let outcome = AssertUnwindSafe(work(&mut *session)).catch_unwind().await;

    let error = match outcome {
        Ok(Ok(value)) => match session.commit().await {
            TransactionResult::Success(()) => {
                debug!("session committed");
                return TransactionResult::Success(value);
            }
            TransactionResult::Failure(commit_error) => {
                warn!(error = %commit_error, "session commit rejected");
                commit_error
            }
        },
        Ok(Err(work_error)) => work_error,
        Err(payload) => RepositoryError::Panicked(panic_message(payload.as_ref())),
    };

    if let TransactionResult::Failure(rollback_error) = session.rollback().await {
        warn!(error = %rollback_error, "session rollback failed");
    }
    TransactionResult::Failure(error)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
