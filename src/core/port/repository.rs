use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use crate::core::dispatch::IoDispatcher;
use crate::core::domain::query::{DeleteQuery, IndexOptions, SelectQuery, UpdateQuery};
use crate::core::domain::repository_error::RepositoryError;
use crate::core::domain::transaction::{SharedTransaction, TransactionContext};
use crate::core::domain::transaction_operation::Operation;
use crate::core::domain::transaction_result::TransactionResult;
use crate::core::use_case::async_repository::AsyncRepository;

/// Blocking repository API implemented by a storage backend.
///
/// Calls made inside [`RepositoryAdapter::within_transaction`] take part in
/// that transaction. What calls made outside it observe while a transaction
/// is open is the backend's contract; the adapter core does not enforce it.
pub trait RepositoryAdapter: Send + Sync + 'static {
    type Entity: Send + 'static;
    type Id: Eq + Hash + Clone + Send + Sync + 'static;
    type Connection: Send + Sync + 'static;

    fn begin_transaction(&self) -> Result<SharedTransaction<Self::Connection>, RepositoryError>;

    fn find(&self, query: &SelectQuery) -> Result<Vec<Self::Entity>, RepositoryError>;

    fn find_all(&self) -> Result<Vec<Self::Entity>, RepositoryError>;

    fn first(&self, query: Option<&SelectQuery>) -> Result<Option<Self::Entity>, RepositoryError>;

    fn find_by_id(&self, id: &Self::Id) -> Result<Option<Self::Entity>, RepositoryError>;

    fn find_all_by_id(
        &self,
        ids: &[Self::Id],
    ) -> Result<HashMap<Self::Id, Self::Entity>, RepositoryError>;

    fn find_ids(&self, query: &SelectQuery) -> Result<Vec<Self::Id>, RepositoryError>;

    fn insert(&self, entity: Self::Entity) -> TransactionResult<bool>;

    fn insert_all(&self, entities: Vec<Self::Entity>) -> TransactionResult<bool>;

    fn update_all(&self, entity: Self::Entity) -> TransactionResult<bool>;

    fn update_all_by_query(&self, query: &UpdateQuery) -> TransactionResult<bool>;

    fn delete(&self, entity: Self::Entity) -> TransactionResult<bool>;

    fn delete_by_id(&self, id: &Self::Id) -> TransactionResult<bool>;

    fn delete_by_query(&self, query: &DeleteQuery) -> TransactionResult<bool>;

    fn clear(&self) -> TransactionResult<bool>;

    fn create_index(&self, index: &IndexOptions) -> TransactionResult<bool>;

    fn create_indexes(&self, indexes: &[IndexOptions]) -> TransactionResult<bool> {
        for index in indexes {
            if let TransactionResult::Failure(error) = self.create_index(index) {
                return TransactionResult::Failure(error);
            }
        }
        TransactionResult::Success(true)
    }

    /// Runs `call` on the current thread with `connection`'s transaction
    /// bound, so plain repository calls made from it join that transaction.
    /// Backends whose connections are not thread-bound just run `call`.
    fn within_transaction<R, F>(&self, connection: &Self::Connection, call: F) -> R
    where
        F: FnOnce() -> R,
        Self: Sized,
    {
        let _ = connection;
        call()
    }

    fn execute<O>(&self, operation: O) -> TransactionResult<O::Output>
    where
        O: Operation<Self>,
        Self: Sized;

    fn execute_in<O>(
        &self,
        operation: O,
        transaction: &dyn TransactionContext<Self::Connection>,
    ) -> TransactionResult<O::Output>
    where
        O: Operation<Self>,
        Self: Sized;
}

pub trait RepositoryAdapterExt: RepositoryAdapter + Sized {
    /// Wraps the adapter in the non-blocking facade with a default dispatcher.
    fn into_async(self: Arc<Self>) -> AsyncRepository<Self> {
        AsyncRepository::new(self, IoDispatcher::default())
    }
}

impl<A: RepositoryAdapter> RepositoryAdapterExt for A {}
