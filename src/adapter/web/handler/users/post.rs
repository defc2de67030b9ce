use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;
use tracing::{debug, error};

use crate::adapter::web::dto::user::{CreateUserWebInput, UserWebOutput};
use crate::adapter::web::presenter::create_user::CreateUserPresenter;
use crate::core::port::create_user::CreateUserInputBoundary;

pub struct CreateUserHandler {
    use_case: Arc<dyn CreateUserInputBoundary>,
}

impl CreateUserHandler {
    pub fn new(use_case: Arc<dyn CreateUserInputBoundary>) -> Self {
        Self { use_case }
    }

    pub async fn create_user(
        &self,
        body: CreateUserWebInput,
    ) -> Result<(StatusCode, Json<UserWebOutput>), (StatusCode, String)> {
        debug!(user_id = body.id, "create user requested");
        let mut presenter = CreateUserPresenter::new();

        if let Err(failure) = self.use_case.execute(body.into(), &mut presenter).await {
            return Err(presenter.failure(failure));
        }

        presenter.take_success().ok_or_else(|| {
            error!("use case finished without reporting the user");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "created user was not reported".to_string(),
            )
        })
    }
}
