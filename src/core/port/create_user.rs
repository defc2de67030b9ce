use async_trait::async_trait;
use thiserror::Error;

use crate::core::domain::entity::user::user::{
    CreateUserValidationError, UnvalidatedCreateUserInput,
};
use crate::core::domain::entity::user::User;
use crate::core::domain::repository_error::RepositoryError;

/// Validates the input and stores the user inside one transaction.
#[async_trait]
pub trait CreateUserInputBoundary: Send + Sync {
    async fn execute(
        &self,
        input: UnvalidatedCreateUserInput,
        output_boundary: &mut dyn CreateUserOutputBoundary,
    ) -> Result<(), CreateUserError>;
}

#[derive(Debug, Error)]
pub enum CreateUserError {
    #[error(transparent)]
    Invalid(#[from] CreateUserValidationError),

    /// Storage refused the write; the transaction was rolled back.
    #[error(transparent)]
    Storage(#[from] RepositoryError),

    #[error("Failed to process output: {0}")]
    Output(#[from] CreateUserOutputError),
}

/// Receives the stored user once the transaction has committed.
pub trait CreateUserOutputBoundary: Send + Sync {
    fn execute(&mut self, created: &User) -> Result<(), CreateUserOutputError>;
}

#[derive(Debug, Error)]
pub enum CreateUserOutputError {
    #[error("Output already reported for user {0}")]
    AlreadyReported(i32),
}
