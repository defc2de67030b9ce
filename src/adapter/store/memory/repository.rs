use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::adapter::store::memory::entity::Entity;
use crate::adapter::store::memory::transaction::{MemoryConnection, MemoryTransaction};
use crate::core::domain::query::{DeleteQuery, IndexOptions, SelectQuery, UpdateQuery};
use crate::core::domain::repository_error::RepositoryError;
use crate::core::domain::transaction::{SharedTransaction, TransactionContext};
use crate::core::domain::transaction_operation::{Operation, OperationContext};
use crate::core::domain::transaction_result::TransactionResult;
use crate::core::port::repository::RepositoryAdapter;

#[derive(Debug, Clone)]
pub(crate) struct Tables<T: Entity> {
    pub(crate) rows: BTreeMap<T::Id, T>,
    pub(crate) indexes: Vec<IndexOptions>,
}

impl<T: Entity> Default for Tables<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            indexes: Vec::new(),
        }
    }
}

impl<T: Entity> Tables<T> {
    /// Rejects `candidate` if its id is taken (when `check_id`) or a unique
    /// index already holds its key. The row with `skip` as id is ignored.
    pub(crate) fn check_insertable(
        &self,
        candidate: &T,
        skip: Option<&T::Id>,
        check_id: bool,
    ) -> Result<(), RepositoryError> {
        let id = candidate.id();
        if check_id && self.rows.contains_key(&id) {
            return Err(RepositoryError::constraint_violation(
                T::NAME,
                format!("duplicate id: {id:?}"),
            ));
        }

        let document = candidate.to_document()?;
        for index in self.indexes.iter().filter(|index| index.unique) {
            let Some(key) = index.key_of(&document) else {
                continue;
            };
            for (other_id, other) in &self.rows {
                if Some(other_id) == skip || *other_id == id {
                    continue;
                }
                if index.key_of(&other.to_document()?).as_ref() == Some(&key) {
                    return Err(RepositoryError::constraint_violation(
                        T::NAME,
                        format!("unique index {} violated by id {id:?}", index.name),
                    ));
                }
            }
        }
        Ok(())
    }

    fn select(&self, query: &SelectQuery) -> Result<Vec<T>, RepositoryError> {
        let mut found = Vec::new();
        for row in self.rows.values() {
            if query.limit.is_some_and(|limit| found.len() >= limit) {
                break;
            }
            if query.matches(&row.to_document()?) {
                found.push(row.clone());
            }
        }
        Ok(found)
    }
}

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Tables plus the transaction currently holding them.
pub(crate) struct Store<T: Entity> {
    pub(crate) tables: Tables<T>,
    pub(crate) open: Option<OpenTransaction<T>>,
}

pub(crate) struct OpenTransaction<T: Entity> {
    pub(crate) id: u64,
    /// Tables as of `begin_transaction`; what callers outside the
    /// transaction read, and what a rollback restores.
    pub(crate) committed: Tables<T>,
}

pub(crate) struct Shared<T: Entity> {
    pub(crate) store: Mutex<Store<T>>,
    /// Signalled whenever the open transaction ends.
    pub(crate) released: Condvar,
}

pub(crate) fn poisoned<E>(_: E) -> RepositoryError {
    RepositoryError::Database("memory store lock poisoned".to_string())
}

thread_local! {
    /// (store address, transaction id) pairs bound by `within_transaction`.
    static BOUND: RefCell<Vec<(usize, u64)>> = const { RefCell::new(Vec::new()) };
}

struct Binding;

impl Drop for Binding {
    fn drop(&mut self) {
        BOUND.with(|bound| {
            bound.borrow_mut().pop();
        });
    }
}

/// In-memory backend implementing the blocking repository API.
///
/// At most one transaction is open at a time; `begin_transaction` waits for
/// the current one to end. Calls made inside `within_transaction` work on the
/// transaction's tables. Everyone else reads the last committed tables, and
/// their writes wait until the transaction ends, so a rollback only undoes
/// the transaction's own writes. Waits give up with `ConcurrencyError` after
/// the lock timeout.
pub struct MemoryRepository<T: Entity> {
    shared: Arc<Shared<T>>,
    next_transaction_id: AtomicU64,
    lock_timeout: Duration,
}

impl<T: Entity> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> MemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                store: Mutex::new(Store {
                    tables: Tables::default(),
                    open: None,
                }),
                released: Condvar::new(),
            }),
            next_transaction_id: AtomicU64::new(1),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Row count as seen by the calling thread.
    pub fn len(&self) -> Result<usize, RepositoryError> {
        self.read(|tables| Ok(tables.rows.len()))
    }

    pub fn is_empty(&self) -> Result<bool, RepositoryError> {
        Ok(self.len()? == 0)
    }

    pub fn in_transaction(&self) -> bool {
        self.shared
            .store
            .lock()
            .map(|store| store.open.is_some())
            .unwrap_or(false)
    }

    fn key(&self) -> usize {
        Arc::as_ptr(&self.shared) as usize
    }

    /// Transaction of this store bound to the current thread, if any.
    fn bound_transaction(&self) -> Option<u64> {
        let key = self.key();
        BOUND.with(|bound| {
            bound
                .borrow()
                .iter()
                .rev()
                .find(|(store, _)| *store == key)
                .map(|(_, transaction_id)| *transaction_id)
        })
    }

    /// Locks the store once `admit` accepts it, or fails after the timeout.
    fn wait_for(
        &self,
        admit: impl Fn(&Store<T>) -> bool,
    ) -> Result<MutexGuard<'_, Store<T>>, RepositoryError> {
        let deadline = Instant::now() + self.lock_timeout;
        let mut store = self.shared.store.lock().map_err(poisoned)?;
        while !admit(&store) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(
                    entity = T::NAME,
                    timeout_ms = self.lock_timeout.as_millis() as u64,
                    "timed out waiting for the open transaction"
                );
                return Err(RepositoryError::ConcurrencyError {
                    entity_type: T::NAME.to_string(),
                });
            }
            store = self
                .shared
                .released
                .wait_timeout(store, remaining)
                .map_err(poisoned)?
                .0;
        }
        Ok(store)
    }

    /// Runs `view` against the tables visible to the calling thread.
    pub(crate) fn read<R>(
        &self,
        view: impl FnOnce(&Tables<T>) -> Result<R, RepositoryError>,
    ) -> Result<R, RepositoryError> {
        let bound = self.bound_transaction();
        let store = self.shared.store.lock().map_err(poisoned)?;
        match &store.open {
            Some(open) if Some(open.id) != bound => view(&open.committed),
            _ => view(&store.tables),
        }
    }

    /// Runs `apply` against the live tables, waiting out any transaction the
    /// calling thread is not bound to.
    pub(crate) fn write<R>(
        &self,
        apply: impl FnOnce(&mut Tables<T>) -> Result<R, RepositoryError>,
    ) -> Result<R, RepositoryError> {
        let bound = self.bound_transaction();
        let mut store = self.wait_for(|store| {
            store
                .open
                .as_ref()
                .map_or(true, |open| Some(open.id) == bound)
        })?;
        apply(&mut store.tables)
    }

    fn try_insert_all(&self, entities: Vec<T>) -> Result<bool, RepositoryError> {
        self.write(|tables| {
            let mut staged = tables.clone();
            for entity in entities {
                staged.check_insertable(&entity, None, true)?;
                staged.rows.insert(entity.id(), entity);
            }
            *tables = staged;
            Ok(true)
        })
    }

    fn try_update(&self, entity: T) -> Result<bool, RepositoryError> {
        self.write(|tables| {
            let id = entity.id();
            if !tables.rows.contains_key(&id) {
                return Ok(false);
            }
            tables.check_insertable(&entity, Some(&id), false)?;
            tables.rows.insert(id, entity);
            Ok(true)
        })
    }

    fn try_update_by_query(&self, query: &UpdateQuery) -> Result<bool, RepositoryError> {
        self.write(|tables| {
            let mut staged = tables.clone();
            let mut updated = 0usize;

            for (id, row) in &tables.rows {
                let mut document = row.to_document()?;
                if !query.matches(&document) {
                    continue;
                }
                if let Some(fields) = document.as_object_mut() {
                    for (field, value) in &query.assignments {
                        fields.insert(field.clone(), value.clone());
                    }
                }
                let changed = T::from_document(document)?;
                if changed.id() != *id {
                    return Err(RepositoryError::Validation {
                        details: format!("update may not change the id of {} {id:?}", T::NAME),
                    });
                }
                staged.check_insertable(&changed, Some(id), false)?;
                staged.rows.insert(id.clone(), changed);
                updated += 1;
            }

            *tables = staged;
            Ok(updated > 0)
        })
    }

    fn try_delete_by_query(&self, query: &DeleteQuery) -> Result<bool, RepositoryError> {
        self.write(|tables| {
            let mut keep = BTreeMap::new();
            let mut removed = false;
            for (id, row) in &tables.rows {
                if query.matches(&row.to_document()?) {
                    removed = true;
                } else {
                    keep.insert(id.clone(), row.clone());
                }
            }
            tables.rows = keep;
            Ok(removed)
        })
    }

    fn try_create_index(&self, index: &IndexOptions) -> Result<bool, RepositoryError> {
        self.write(|tables| {
            if tables.indexes.iter().any(|existing| existing.name == index.name) {
                return Ok(false);
            }
            if index.unique {
                let mut seen = Vec::new();
                for row in tables.rows.values() {
                    if let Some(key) = index.key_of(&row.to_document()?) {
                        if seen.contains(&key) {
                            return Err(RepositoryError::constraint_violation(
                                T::NAME,
                                format!("existing rows violate unique index {}", index.name),
                            ));
                        }
                        seen.push(key);
                    }
                }
            }
            tables.indexes.push(index.clone());
            debug!(index = %index.name, unique = index.unique, "index created");
            Ok(true)
        })
    }
}

impl<T: Entity> RepositoryAdapter for MemoryRepository<T> {
    type Entity = T;
    type Id = T::Id;
    type Connection = MemoryConnection;

    fn begin_transaction(&self) -> Result<SharedTransaction<MemoryConnection>, RepositoryError> {
        let mut store = self.wait_for(|store| store.open.is_none())?;
        let transaction_id = self.next_transaction_id.fetch_add(1, Ordering::SeqCst);
        let committed = store.tables.clone();
        store.open = Some(OpenTransaction {
            id: transaction_id,
            committed,
        });
        drop(store);
        debug!(transaction_id, "memory transaction started");

        Ok(Arc::new(MemoryTransaction::new(
            MemoryConnection { transaction_id },
            self.shared.clone(),
        )))
    }

    fn find(&self, query: &SelectQuery) -> Result<Vec<T>, RepositoryError> {
        self.read(|tables| tables.select(query))
    }

    fn find_all(&self) -> Result<Vec<T>, RepositoryError> {
        self.read(|tables| Ok(tables.rows.values().cloned().collect()))
    }

    fn first(&self, query: Option<&SelectQuery>) -> Result<Option<T>, RepositoryError> {
        match query {
            Some(query) => {
                let query = query.clone().limit(1);
                self.read(|tables| Ok(tables.select(&query)?.into_iter().next()))
            }
            None => self.read(|tables| Ok(tables.rows.values().next().cloned())),
        }
    }

    fn find_by_id(&self, id: &T::Id) -> Result<Option<T>, RepositoryError> {
        self.read(|tables| Ok(tables.rows.get(id).cloned()))
    }

    fn find_all_by_id(&self, ids: &[T::Id]) -> Result<HashMap<T::Id, T>, RepositoryError> {
        self.read(|tables| {
            Ok(ids
                .iter()
                .filter_map(|id| tables.rows.get(id).map(|row| (id.clone(), row.clone())))
                .collect())
        })
    }

    fn find_ids(&self, query: &SelectQuery) -> Result<Vec<T::Id>, RepositoryError> {
        Ok(self.find(query)?.iter().map(Entity::id).collect())
    }

    fn insert(&self, entity: T) -> TransactionResult<bool> {
        self.try_insert_all(vec![entity]).into()
    }

    fn insert_all(&self, entities: Vec<T>) -> TransactionResult<bool> {
        self.try_insert_all(entities).into()
    }

    fn update_all(&self, entity: T) -> TransactionResult<bool> {
        self.try_update(entity).into()
    }

    fn update_all_by_query(&self, query: &UpdateQuery) -> TransactionResult<bool> {
        self.try_update_by_query(query).into()
    }

    fn delete(&self, entity: T) -> TransactionResult<bool> {
        self.delete_by_id(&entity.id())
    }

    fn delete_by_id(&self, id: &T::Id) -> TransactionResult<bool> {
        self.write(|tables| Ok(tables.rows.remove(id).is_some()))
            .into()
    }

    fn delete_by_query(&self, query: &DeleteQuery) -> TransactionResult<bool> {
        self.try_delete_by_query(query).into()
    }

    fn clear(&self) -> TransactionResult<bool> {
        self.write(|tables| {
            tables.rows.clear();
            Ok(true)
        })
        .into()
    }

    fn create_index(&self, index: &IndexOptions) -> TransactionResult<bool> {
        self.try_create_index(index).into()
    }

    fn within_transaction<R, F>(&self, connection: &MemoryConnection, call: F) -> R
    where
        F: FnOnce() -> R,
    {
        let key = self.key();
        BOUND.with(|bound| {
            bound
                .borrow_mut()
                .push((key, connection.transaction_id))
        });
        let _binding = Binding;
        call()
    }

    fn execute<O>(&self, operation: O) -> TransactionResult<O::Output>
    where
        O: Operation<Self>,
    {
        operation.execute(&OperationContext::new(self))
    }

    fn execute_in<O>(
        &self,
        operation: O,
        transaction: &dyn TransactionContext<MemoryConnection>,
    ) -> TransactionResult<O::Output>
    where
        O: Operation<Self>,
    {
        let connection = transaction.connection();
        let open = self
            .shared
            .store
            .lock()
            .ok()
            .and_then(|store| store.open.as_ref().map(|open| open.id));
        if open != Some(connection.transaction_id) {
            return TransactionResult::Failure(RepositoryError::Connection(format!(
                "transaction {} is not open on this repository",
                connection.transaction_id
            )));
        }
        self.within_transaction(connection, || {
            operation.execute(&OperationContext::new(self).with_transaction(transaction))
        })
    }
}
