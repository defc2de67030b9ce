use axum::http::StatusCode;
use tracing::error;

use crate::adapter::store::memory::user::MemoryUserRepository;
use crate::adapter::web::dto::user::UserWebOutput;
use crate::core::use_case::async_repository::AsyncRepository;

pub struct FindUserHandler {
    users: AsyncRepository<MemoryUserRepository>,
}

impl FindUserHandler {
    pub fn new(users: AsyncRepository<MemoryUserRepository>) -> Self {
        Self { users }
    }

    pub async fn find_user(&self, id: i32) -> Result<UserWebOutput, (StatusCode, String)> {
        match self.users.find_by_id(id).await {
            Ok(Some(user)) => Ok(user.into()),
            Ok(None) => Err((StatusCode::NOT_FOUND, format!("User {id} not found"))),
            Err(e) => {
                error!(error = %e, user_id = id, "failed to load user");
                Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
            }
        }
    }
}
