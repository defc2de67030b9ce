#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tx_adapter::adapter::store::memory::repository::MemoryRepository;
use tx_adapter::adapter::store::memory::transaction::MemoryConnection;
use tx_adapter::core::domain::entity::user::User;
use tx_adapter::core::domain::query::{DeleteQuery, IndexOptions, SelectQuery, UpdateQuery};
use tx_adapter::core::domain::repository_error::RepositoryError;
use tx_adapter::core::domain::transaction::{SharedTransaction, TransactionContext};
use tx_adapter::core::domain::transaction_operation::{Operation, OperationContext};
use tx_adapter::core::domain::transaction_result::TransactionResult;
use tx_adapter::core::port::repository::RepositoryAdapter;
use tx_adapter::core::port::session::DatabaseSession;

/// Records what reached the backend and lets a test inject failures.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<String>>,
    commit_error: Mutex<Option<RepositoryError>>,
    rollback_error: Mutex<Option<RepositoryError>>,
    slow_reads: AtomicBool,
    slow_writes: AtomicBool,
}

impl Recorder {
    pub fn record(&self, event: &str) {
        self.events.lock().unwrap().push(event.to_string());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events.lock().unwrap().iter().filter(|e| *e == event).count()
    }

    pub fn fail_commit_with(&self, error: RepositoryError) {
        *self.commit_error.lock().unwrap() = Some(error);
    }

    pub fn fail_rollback_with(&self, error: RepositoryError) {
        *self.rollback_error.lock().unwrap() = Some(error);
    }

    pub fn slow_reads(&self) {
        self.slow_reads.store(true, Ordering::SeqCst);
    }

    /// Makes every `insert` take 300ms before it reaches the store.
    pub fn slow_writes(&self) {
        self.slow_writes.store(true, Ordering::SeqCst);
    }
}

pub struct RecordingTransaction {
    inner: SharedTransaction<MemoryConnection>,
    recorder: Arc<Recorder>,
}

impl TransactionContext<MemoryConnection> for RecordingTransaction {
    fn connection(&self) -> &MemoryConnection {
        self.inner.connection()
    }

    fn commit(&self) -> Result<(), RepositoryError> {
        self.recorder.record("commit");
        if let Some(error) = self.recorder.commit_error.lock().unwrap().clone() {
            return Err(error);
        }
        self.inner.commit()
    }

    fn rollback(&self) -> Result<(), RepositoryError> {
        self.recorder.record("rollback");
        self.inner.rollback()?;
        match self.recorder.rollback_error.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Memory-backed user repository that reports every call to a [`Recorder`].
pub struct RecordingRepository {
    inner: MemoryRepository<User>,
    pub recorder: Arc<Recorder>,
}

impl RecordingRepository {
    pub fn new() -> Self {
        Self {
            inner: MemoryRepository::new().with_lock_timeout(Duration::from_millis(500)),
            recorder: Arc::new(Recorder::default()),
        }
    }

    /// Committed row count, as seen from outside any transaction.
    pub fn stored(&self) -> usize {
        self.inner.len().unwrap()
    }

    pub fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }
}

impl RepositoryAdapter for RecordingRepository {
    type Entity = User;
    type Id = i32;
    type Connection = MemoryConnection;

    fn begin_transaction(&self) -> Result<SharedTransaction<MemoryConnection>, RepositoryError> {
        self.recorder.record("begin");
        let inner = self.inner.begin_transaction()?;
        Ok(Arc::new(RecordingTransaction {
            inner,
            recorder: self.recorder.clone(),
        }))
    }

    fn find(&self, query: &SelectQuery) -> Result<Vec<User>, RepositoryError> {
        self.recorder.record("find");
        self.inner.find(query)
    }

    fn find_all(&self) -> Result<Vec<User>, RepositoryError> {
        if self.recorder.slow_reads.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(300));
        }
        self.recorder.record("find_all");
        self.inner.find_all()
    }

    fn first(&self, query: Option<&SelectQuery>) -> Result<Option<User>, RepositoryError> {
        self.recorder.record("first");
        self.inner.first(query)
    }

    fn find_by_id(&self, id: &i32) -> Result<Option<User>, RepositoryError> {
        self.recorder.record("find_by_id");
        self.inner.find_by_id(id)
    }

    fn find_all_by_id(&self, ids: &[i32]) -> Result<HashMap<i32, User>, RepositoryError> {
        self.recorder.record("find_all_by_id");
        self.inner.find_all_by_id(ids)
    }

    fn find_ids(&self, query: &SelectQuery) -> Result<Vec<i32>, RepositoryError> {
        self.recorder.record("find_ids");
        self.inner.find_ids(query)
    }

    fn insert(&self, entity: User) -> TransactionResult<bool> {
        if self.recorder.slow_writes.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(300));
        }
        self.recorder.record("insert");
        self.inner.insert(entity)
    }

    fn insert_all(&self, entities: Vec<User>) -> TransactionResult<bool> {
        self.recorder.record("insert_all");
        self.inner.insert_all(entities)
    }

    fn update_all(&self, entity: User) -> TransactionResult<bool> {
        self.recorder.record("update_all");
        self.inner.update_all(entity)
    }

    fn update_all_by_query(&self, query: &UpdateQuery) -> TransactionResult<bool> {
        self.recorder.record("update_all_by_query");
        self.inner.update_all_by_query(query)
    }

    fn delete(&self, entity: User) -> TransactionResult<bool> {
        self.recorder.record("delete");
        self.inner.delete(entity)
    }

    fn delete_by_id(&self, id: &i32) -> TransactionResult<bool> {
        self.recorder.record("delete_by_id");
        self.inner.delete_by_id(id)
    }

    fn delete_by_query(&self, query: &DeleteQuery) -> TransactionResult<bool> {
        self.recorder.record("delete_by_query");
        self.inner.delete_by_query(query)
    }

    fn clear(&self) -> TransactionResult<bool> {
        self.recorder.record("clear");
        self.inner.clear()
    }

    fn create_index(&self, index: &IndexOptions) -> TransactionResult<bool> {
        self.recorder.record("create_index");
        self.inner.create_index(index)
    }

    fn within_transaction<R, F>(&self, connection: &MemoryConnection, call: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.inner.within_transaction(connection, call)
    }

    fn execute<O>(&self, operation: O) -> TransactionResult<O::Output>
    where
        O: Operation<Self>,
    {
        self.recorder.record("execute");
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
        self.recorder.record("execute_in");
        self.within_transaction(transaction.connection(), || {
            operation.execute(&OperationContext::new(self).with_transaction(transaction))
        })
    }
}

/// Session whose commit outcome is fixed up front.
pub struct ScriptedSession {
    pub log: Vec<String>,
    pub commits: usize,
    pub rollbacks: usize,
    commit_outcome: TransactionResult<()>,
}

impl ScriptedSession {
    pub fn committing() -> Self {
        Self::with_commit(TransactionResult::Success(()))
    }

    pub fn rejecting(error: RepositoryError) -> Self {
        Self::with_commit(TransactionResult::Failure(error))
    }

    fn with_commit(commit_outcome: TransactionResult<()>) -> Self {
        Self {
            log: Vec::new(),
            commits: 0,
            rollbacks: 0,
            commit_outcome,
        }
    }
}

#[async_trait]
impl DatabaseSession for ScriptedSession {
    async fn commit(&mut self) -> TransactionResult<()> {
        self.commits += 1;
        self.log.push("commit".to_string());
        self.commit_outcome.clone()
    }

    async fn rollback(&mut self) -> TransactionResult<()> {
        self.rollbacks += 1;
        self.log.push("rollback".to_string());
        TransactionResult::Success(())
    }
}

pub fn alice() -> User {
    User::new(1, "alice", "alice@example.com")
}

pub fn bob() -> User {
    User::new(2, "bob", "bob@example.com")
}
