use std::collections::HashMap;
use std::sync::Arc;

use crate::core::dispatch::{CallScope, IoDispatcher};
use crate::core::domain::query::{DeleteQuery, IndexOptions, SelectQuery, UpdateQuery};
use crate::core::domain::repository_error::RepositoryError;
use crate::core::domain::transaction::SharedTransaction;
use crate::core::domain::transaction_operation::Operation;
use crate::core::domain::transaction_result::TransactionResult;
use crate::core::port::repository::RepositoryAdapter;

/// Non-blocking view over a [`RepositoryAdapter`].
///
/// Each method moves its arguments onto the I/O dispatcher, runs the
/// blocking call there and resumes the caller with the backend's answer.
/// Nothing is reordered, batched or retried.
///
/// A view handed out by `run_in_transaction` is bound to that transaction:
/// every call runs inside it and is counted by the guard, which waits for
/// running calls before it commits or rolls back.
pub struct AsyncRepository<A: RepositoryAdapter> {
    adapter: Arc<A>,
    dispatcher: IoDispatcher,
    bound: Option<Bound<A::Connection>>,
}

struct Bound<C> {
    transaction: SharedTransaction<C>,
    calls: CallScope,
}

impl<C> Clone for Bound<C> {
    fn clone(&self) -> Self {
        Self {
            transaction: self.transaction.clone(),
            calls: self.calls.clone(),
        }
    }
}

impl<A: RepositoryAdapter> Clone for AsyncRepository<A> {
    fn clone(&self) -> Self {
        Self {
            adapter: self.adapter.clone(),
            dispatcher: self.dispatcher.clone(),
            bound: self.bound.clone(),
        }
    }
}

impl<A: RepositoryAdapter> AsyncRepository<A> {
    pub fn new(adapter: Arc<A>, dispatcher: IoDispatcher) -> Self {
        Self {
            adapter,
            dispatcher,
            bound: None,
        }
    }

    /// A view whose calls run inside `transaction` and register with `calls`.
    pub(crate) fn bound_to(
        &self,
        transaction: SharedTransaction<A::Connection>,
        calls: CallScope,
    ) -> Self {
        Self {
            adapter: self.adapter.clone(),
            dispatcher: self.dispatcher.clone(),
            bound: Some(Bound { transaction, calls }),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    pub fn adapter(&self) -> &Arc<A> {
        &self.adapter
    }

    pub fn dispatcher(&self) -> &IoDispatcher {
        &self.dispatcher
    }

    async fn run<R, F>(&self, call: F) -> Result<R, RepositoryError>
    where
        F: FnOnce(&A) -> R + Send + 'static,
        R: Send + 'static,
    {
        let adapter = self.adapter.clone();
        let bound = self.bound.clone();
        self.dispatcher
            .dispatch(move || match bound {
                None => Ok::<_, RepositoryError>(call(&adapter)),
                Some(bound) => {
                    let _entry = bound.calls.enter()?;
                    let connection = bound.transaction.connection();
                    Ok(adapter.within_transaction(connection, || call(&adapter)))
                }
            })
            .await?
    }

    async fn run_tx<R, F>(&self, call: F) -> TransactionResult<R>
    where
        F: FnOnce(&A) -> TransactionResult<R> + Send + 'static,
        R: Send + 'static,
    {
        match self.run(call).await {
            Ok(result) => result,
            Err(dispatch_error) => TransactionResult::Failure(dispatch_error),
        }
    }

    pub async fn begin_transaction(&self) -> Result<SharedTransaction<A::Connection>, RepositoryError> {
        self.run(|adapter| adapter.begin_transaction()).await?
    }

    pub async fn find(&self, query: SelectQuery) -> Result<Vec<A::Entity>, RepositoryError> {
        self.run(move |adapter| adapter.find(&query)).await?
    }

    pub async fn find_all(&self) -> Result<Vec<A::Entity>, RepositoryError> {
        self.run(|adapter| adapter.find_all()).await?
    }

    pub async fn first(&self, query: Option<SelectQuery>) -> Result<Option<A::Entity>, RepositoryError> {
        self.run(move |adapter| adapter.first(query.as_ref())).await?
    }

    pub async fn find_by_id(&self, id: A::Id) -> Result<Option<A::Entity>, RepositoryError> {
        self.run(move |adapter| adapter.find_by_id(&id)).await?
    }

    pub async fn find_all_by_id(
        &self,
        ids: Vec<A::Id>,
    ) -> Result<HashMap<A::Id, A::Entity>, RepositoryError> {
        self.run(move |adapter| adapter.find_all_by_id(&ids)).await?
    }

    pub async fn find_ids(&self, query: SelectQuery) -> Result<Vec<A::Id>, RepositoryError> {
        self.run(move |adapter| adapter.find_ids(&query)).await?
    }

    pub async fn insert(&self, entity: A::Entity) -> TransactionResult<bool> {
        self.run_tx(move |adapter| adapter.insert(entity)).await
    }

    pub async fn insert_all(&self, entities: Vec<A::Entity>) -> TransactionResult<bool> {
        self.run_tx(move |adapter| adapter.insert_all(entities)).await
    }

    pub async fn update_all(&self, entity: A::Entity) -> TransactionResult<bool> {
        self.run_tx(move |adapter| adapter.update_all(entity)).await
    }

    pub async fn update_all_by_query(&self, query: UpdateQuery) -> TransactionResult<bool> {
        self.run_tx(move |adapter| adapter.update_all_by_query(&query)).await
    }

    pub async fn delete(&self, entity: A::Entity) -> TransactionResult<bool> {
        self.run_tx(move |adapter| adapter.delete(entity)).await
    }

    pub async fn delete_by_id(&self, id: A::Id) -> TransactionResult<bool> {
        self.run_tx(move |adapter| adapter.delete_by_id(&id)).await
    }

    pub async fn delete_by_query(&self, query: DeleteQuery) -> TransactionResult<bool> {
        self.run_tx(move |adapter| adapter.delete_by_query(&query)).await
    }

    pub async fn clear(&self) -> TransactionResult<bool> {
        self.run_tx(|adapter| adapter.clear()).await
    }

    pub async fn create_index(&self, index: IndexOptions) -> TransactionResult<bool> {
        self.run_tx(move |adapter| adapter.create_index(&index)).await
    }

    pub async fn create_indexes(&self, indexes: Vec<IndexOptions>) -> TransactionResult<bool> {
        self.run_tx(move |adapter| adapter.create_indexes(&indexes)).await
    }

    pub async fn execute<O>(&self, operation: O) -> TransactionResult<O::Output>
    where
        O: Operation<A>,
    {
        self.run_tx(move |adapter| adapter.execute(operation)).await
    }

    /// Runs `operation` inside an already open transaction.
    pub async fn execute_in<O>(
        &self,
        operation: O,
        transaction: SharedTransaction<A::Connection>,
    ) -> TransactionResult<O::Output>
    where
        O: Operation<A>,
    {
        self.run_tx(move |adapter| adapter.execute_in(operation, transaction.as_ref()))
            .await
    }
}
