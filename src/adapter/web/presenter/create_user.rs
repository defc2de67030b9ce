use axum::http::StatusCode;
use axum::Json;
use tracing::warn;

use crate::adapter::web::dto::user::UserWebOutput;
use crate::core::domain::entity::user::User;
use crate::core::domain::repository_error::RepositoryError;
use crate::core::port::create_user::{
    CreateUserError, CreateUserOutputBoundary, CreateUserOutputError,
};

#[derive(Default)]
pub struct CreateUserPresenter {
    created: Option<UserWebOutput>,
}

impl CreateUserPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Response for the reported user, if the use case reported one.
    pub(crate) fn take_success(&mut self) -> Option<(StatusCode, Json<UserWebOutput>)> {
        self.created
            .take()
            .map(|created| (StatusCode::CREATED, Json(created)))
    }

    pub(crate) fn failure(&self, error: CreateUserError) -> (StatusCode, String) {
        let status = match &error {
            CreateUserError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CreateUserError::Storage(RepositoryError::ConstraintViolation { .. })
            | CreateUserError::Storage(RepositoryError::ConcurrencyError { .. }) => {
                StatusCode::CONFLICT
            }
            CreateUserError::Storage(_) | CreateUserError::Output(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        warn!(error = %error, status = %status, "failed to create user");
        (status, format!("Failed to create user: {error}"))
    }
}

impl CreateUserOutputBoundary for CreateUserPresenter {
    fn execute(&mut self, created: &User) -> Result<(), CreateUserOutputError> {
        if let Some(existing) = &self.created {
            return Err(CreateUserOutputError::AlreadyReported(existing.id));
        }
        self.created = Some(created.clone().into());
        Ok(())
    }
}
