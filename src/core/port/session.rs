use async_trait::async_trait;

use crate::core::domain::transaction_result::TransactionResult;

/// A long-lived storage session that reports commit outcomes as values.
#[async_trait]
pub trait DatabaseSession: Send {
    /// A `Failure` means the commit was attempted and rejected.
    async fn commit(&mut self) -> TransactionResult<()>;

    async fn rollback(&mut self) -> TransactionResult<()>;
}
