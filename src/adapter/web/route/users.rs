use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use crate::adapter::web::app_state::AppState;
use crate::adapter::web::dto::user::{CreateUserWebInput, UserWebOutput};
use crate::adapter::web::handler::users::delete::DeleteUserHandler;
use crate::adapter::web::handler::users::get::FindUserHandler;
use crate::adapter::web::handler::users::post::CreateUserHandler;

pub async fn post(
    State(state): State<Arc<AppState>>,
    Json(user): Json<CreateUserWebInput>,
) -> Result<(StatusCode, Json<UserWebOutput>), (StatusCode, String)> {
    let handler = CreateUserHandler::new(state.user_create_use_case.clone());
    handler.create_user(user).await
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<UserWebOutput>, (StatusCode, String)> {
    let handler = FindUserHandler::new(state.users.clone());
    handler.find_user(id).await.map(Json)
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<StatusCode, (StatusCode, String)> {
    let handler = DeleteUserHandler::new(state.users.clone());
    handler.delete_user(id).await
}
