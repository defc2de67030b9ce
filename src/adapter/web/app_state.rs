use std::sync::Arc;

use crate::adapter::store::memory::user::MemoryUserRepository;
use crate::core::port::create_user::CreateUserInputBoundary;
use crate::core::use_case::async_repository::AsyncRepository;

pub struct AppState {
    pub users: AsyncRepository<MemoryUserRepository>,
    pub user_create_use_case: Arc<dyn CreateUserInputBoundary>,
}
