use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::hash::Hash;

use crate::core::domain::repository_error::RepositoryError;

/// A row stored by the in-memory backend.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Id: Ord + Hash + Clone + Debug + Send + Sync + 'static;

    /// Name used in error details.
    const NAME: &'static str;

    fn id(&self) -> Self::Id;

    fn to_document(&self) -> Result<serde_json::Value, RepositoryError> {
        serde_json::to_value(self)
            .map_err(|e| RepositoryError::Database(format!("failed to encode {}: {e}", Self::NAME)))
    }

    fn from_document(document: serde_json::Value) -> Result<Self, RepositoryError> {
        serde_json::from_value(document)
            .map_err(|e| RepositoryError::Database(format!("failed to decode {}: {e}", Self::NAME)))
    }
}
