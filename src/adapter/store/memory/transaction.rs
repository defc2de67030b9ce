use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::adapter::store::memory::entity::Entity;
use crate::adapter::store::memory::repository::{poisoned, Shared};
use crate::core::domain::repository_error::RepositoryError;
use crate::core::domain::transaction::{TransactionContext, TransactionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConnection {
    pub transaction_id: u64,
}

/// Snapshot-based transaction: rollback puts the tables back as they were at
/// `begin_transaction`. Commit and rollback after the first terminal call
/// are no-ops. Either one releases the store to waiting callers.
pub struct MemoryTransaction<T: Entity> {
    connection: MemoryConnection,
    state: Mutex<TransactionState>,
    shared: Arc<Shared<T>>,
}

impl<T: Entity> MemoryTransaction<T> {
    pub(crate) fn new(connection: MemoryConnection, shared: Arc<Shared<T>>) -> Self {
        Self {
            connection,
            state: Mutex::new(TransactionState::Open),
            shared,
        }
    }

    pub fn state(&self) -> TransactionState {
        self.state
            .lock()
            .map(|state| *state)
            .unwrap_or(TransactionState::Failed)
    }

    fn finish(&self, target: TransactionState) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().map_err(poisoned)?;
        if state.is_terminal() {
            return Ok(());
        }

        let mut store = self.shared.store.lock().map_err(poisoned)?;
        let open = match store.open.take() {
            Some(open) if open.id == self.connection.transaction_id => open,
            other => {
                store.open = other;
                state.transition(TransactionState::Failed)?;
                return Err(RepositoryError::Connection(format!(
                    "transaction {} is no longer open",
                    self.connection.transaction_id
                )));
            }
        };
        if target == TransactionState::RolledBack {
            store.tables = open.committed;
        }
        drop(store);
        self.shared.released.notify_all();

        state.transition(target)?;
        debug!(
            transaction_id = self.connection.transaction_id,
            state = %target,
            "memory transaction finished"
        );
        Ok(())
    }
}

impl<T: Entity> TransactionContext<MemoryConnection> for MemoryTransaction<T> {
    fn connection(&self) -> &MemoryConnection {
        &self.connection
    }

    fn commit(&self) -> Result<(), RepositoryError> {
        self.finish(TransactionState::Committed)
    }

    fn rollback(&self) -> Result<(), RepositoryError> {
        self.finish(TransactionState::RolledBack)
    }
}

impl<T: Entity> Drop for MemoryTransaction<T> {
    fn drop(&mut self) {
        if self.state().is_terminal() {
            return;
        }
        if let Err(e) = self.finish(TransactionState::RolledBack) {
            warn!(
                error = %e,
                transaction_id = self.connection.transaction_id,
                "rollback on drop failed"
            );
        }
    }
}
