use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::adapter::store::memory::entity::Entity;
use crate::adapter::store::memory::repository::MemoryRepository;
use crate::core::domain::repository_error::RepositoryError;
use crate::core::domain::transaction_result::TransactionResult;
use crate::core::port::session::DatabaseSession;

#[derive(Debug, Clone)]
enum StagedWrite<T: Entity> {
    Insert(T),
    Delete(T::Id),
}

/// Buffers writes and applies them to the repository on commit.
///
/// Constraints are checked at commit time, so a duplicate insert surfaces as
/// a `Failure` from `commit` and nothing is applied.
pub struct MemorySession<T: Entity> {
    repository: Arc<MemoryRepository<T>>,
    staged: Vec<StagedWrite<T>>,
}

impl<T: Entity> MemorySession<T> {
    pub fn new(repository: Arc<MemoryRepository<T>>) -> Self {
        Self {
            repository,
            staged: Vec::new(),
        }
    }

    pub fn repository(&self) -> &Arc<MemoryRepository<T>> {
        &self.repository
    }

    pub fn insert(&mut self, entity: T) {
        self.staged.push(StagedWrite::Insert(entity));
    }

    pub fn delete_by_id(&mut self, id: T::Id) {
        self.staged.push(StagedWrite::Delete(id));
    }

    pub fn pending(&self) -> usize {
        self.staged.len()
    }

    /// Reads through staged writes before falling back to the repository.
    pub fn find_by_id(&self, id: &T::Id) -> Result<Option<T>, RepositoryError> {
        for write in self.staged.iter().rev() {
            match write {
                StagedWrite::Insert(entity) if entity.id() == *id => {
                    return Ok(Some(entity.clone()))
                }
                StagedWrite::Delete(deleted) if deleted == id => return Ok(None),
                _ => {}
            }
        }
        self.repository.read(|tables| Ok(tables.rows.get(id).cloned()))
    }

    fn apply(&self) -> Result<(), RepositoryError> {
        self.repository.write(|tables| {
            let mut staged_tables = tables.clone();
            for write in &self.staged {
                match write {
                    StagedWrite::Insert(entity) => {
                        staged_tables.check_insertable(entity, None, true)?;
                        staged_tables.rows.insert(entity.id(), entity.clone());
                    }
                    StagedWrite::Delete(id) => {
                        staged_tables.rows.remove(id);
                    }
                }
            }
            *tables = staged_tables;
            Ok(())
        })
    }
}

#[async_trait]
impl<T: Entity> DatabaseSession for MemorySession<T> {
    async fn commit(&mut self) -> TransactionResult<()> {
        let applied = self.staged.len();
        let result = self.apply();
        if result.is_ok() {
            self.staged.clear();
            debug!(applied, "memory session committed");
        }
        result.into()
    }

    async fn rollback(&mut self) -> TransactionResult<()> {
        debug!(discarded = self.staged.len(), "memory session rolled back");
        self.staged.clear();
        TransactionResult::Success(())
    }
}
