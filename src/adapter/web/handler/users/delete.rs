use axum::http::StatusCode;
use tracing::error;

use crate::adapter::store::memory::user::MemoryUserRepository;
use crate::core::domain::transaction_result::TransactionResult;
use crate::core::use_case::async_repository::AsyncRepository;

pub struct DeleteUserHandler {
    users: AsyncRepository<MemoryUserRepository>,
}

impl DeleteUserHandler {
    pub fn new(users: AsyncRepository<MemoryUserRepository>) -> Self {
        Self { users }
    }

    pub async fn delete_user(&self, id: i32) -> Result<StatusCode, (StatusCode, String)> {
        match self.users.delete_by_id(id).await {
            TransactionResult::Success(true) => Ok(StatusCode::NO_CONTENT),
            TransactionResult::Success(false) => {
                Err((StatusCode::NOT_FOUND, format!("User {id} not found")))
            }
            TransactionResult::Failure(e) => {
                error!(error = %e, user_id = id, "failed to delete user");
                Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
            }
        }
    }
}
