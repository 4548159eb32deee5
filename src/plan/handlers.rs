use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{PlanResponse, Task, UpdateTaskRequest},
    services::generate_plan,
};
use crate::{auth::AuthUser, error::ApiError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/functions/generate-plan", post(generate))
        .route("/tasks", get(list_tasks))
        .route("/tasks/:id", patch(update_task))
}

#[instrument(skip(state))]
pub async fn generate(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PlanResponse>, ApiError> {
    Ok(Json(generate_plan(&state, user_id).await?))
}

#[instrument(skip(state))]
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Task>>, ApiError> {
    Ok(Json(state.tasks.list_by_user(user_id).await?))
}

#[instrument(skip(state, body))]
pub async fn update_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    state
        .tasks
        .set_completed(user_id, id, body.completed)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Task not found".into()))
}
