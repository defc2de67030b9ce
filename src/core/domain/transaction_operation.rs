use serde_json::Value;
use std::collections::HashMap;

use crate::core::domain::repository_error::RepositoryError;
use crate::core::domain::transaction::TransactionContext;
use crate::core::domain::transaction_result::TransactionResult;
use crate::core::port::repository::RepositoryAdapter;

/// A unit of work handed to `RepositoryAdapter::execute`.
///
/// The adapter core forwards operations untouched; only the backend calls
/// `execute`.
pub trait Operation<A: RepositoryAdapter + ?Sized>: Send + 'static {
    type Output: Send + 'static;

    fn execute(&self, context: &OperationContext<'_, A>) -> TransactionResult<Self::Output>;
}

/// Everything an operation may touch while it runs.
pub struct OperationContext<'a, A: RepositoryAdapter + ?Sized> {
    repository: &'a A,
    transaction: Option<&'a dyn TransactionContext<A::Connection>>,
    attributes: HashMap<String, Value>,
}

impl<'a, A: RepositoryAdapter + ?Sized> OperationContext<'a, A> {
    pub fn new(repository: &'a A) -> Self {
        Self {
            repository,
            transaction: None,
            attributes: HashMap::new(),
        }
    }

    pub fn with_transaction(self, transaction: &'a dyn TransactionContext<A::Connection>) -> Self {
        Self {
            transaction: Some(transaction),
            ..self
        }
    }

    pub fn repository(&self) -> &'a A {
        self.repository
    }

    pub fn transaction(&self) -> Option<&'a dyn TransactionContext<A::Connection>> {
        self.transaction
    }

    pub fn set_attribute(&mut self, key: &str, value: impl Into<Value>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn required_attribute(&self, key: &str) -> Result<&Value, RepositoryError> {
        self.attributes
            .get(key)
            .ok_or_else(|| RepositoryError::Validation {
                details: format!("required attribute not found: {key}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::store::memory::repository::MemoryRepository;
    use crate::core::domain::entity::user::User;
    use serde_json::json;

    #[test]
    fn attributes_are_scoped_to_the_context() {
        let repo = MemoryRepository::<User>::new();
        let mut context = OperationContext::new(&repo);
        assert!(context.transaction().is_none());
        assert!(context.attribute("tenant").is_none());

        context.set_attribute("tenant", "acme");
        context.set_attribute("batch", 3);
        assert_eq!(context.attribute("tenant"), Some(&json!("acme")));
        assert_eq!(context.required_attribute("batch").unwrap(), &json!(3));
        assert!(matches!(
            context.required_attribute("missing"),
            Err(RepositoryError::Validation { .. })
        ));
    }

    #[test]
    fn with_transaction_keeps_attributes() {
        let repo = MemoryRepository::<User>::new();
        let transaction = repo.begin_transaction().unwrap();
        let mut context = OperationContext::new(&repo);
        context.set_attribute("tenant", "acme");

        let context = context.with_transaction(transaction.as_ref());
        assert_eq!(context.transaction().map(|tx| tx.connection().transaction_id), Some(1));
        assert!(context.attribute("tenant").is_some());
        transaction.rollback().unwrap();
    }
}
