use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::adapter::config::AppConfig;
use crate::adapter::store::memory::user::{user_indexes, MemoryUserRepository};
use crate::adapter::web::app_state::AppState;
use crate::core::dispatch::IoDispatcher;
use crate::core::domain::repository_error::RepositoryError;
use crate::core::use_case::async_repository::AsyncRepository;
use crate::core::use_case::create_user::CreateUserUseCase;

pub struct AppInitializer;

impl AppInitializer {
    pub async fn initialize(config: &AppConfig) -> Result<Arc<AppState>, AppInitializerError> {
        let dispatcher = IoDispatcher::new(config.dispatcher_config());
        let users = AsyncRepository::new(Arc::new(MemoryUserRepository::new()), dispatcher);

        users
            .create_indexes(user_indexes())
            .await
            .into_result()
            .map_err(AppInitializerError::SchemaInitError)?;
        debug!(max_in_flight = config.io_max_in_flight, "user repository ready");

        let user_create_use_case = Arc::new(CreateUserUseCase::new(users.clone()));

        Ok(Arc::new(AppState {
            users,
            user_create_use_case,
        }))
    }
}

#[derive(Debug, Error)]
pub enum AppInitializerError {
    #[error("Failed to initialize schema: {0}")]
    SchemaInitError(RepositoryError),
}
