use axum::{extract::State, routing::post, Json, Router};
use tracing::instrument;

use super::{
    dto::{DeleteUserRequest, DeletionReport},
    services::delete_user,
};
use crate::{auth::AuthUser, error::ApiError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/functions/admin-delete-user", post(admin_delete_user))
}

#[instrument(skip(state, body))]
pub async fn admin_delete_user(
    State(state): State<AppState>,
    AuthUser(caller_id): AuthUser,
    Json(body): Json<DeleteUserRequest>,
) -> Result<Json<DeletionReport>, ApiError> {
    Ok(Json(delete_user(&state, caller_id, body.target_user_id).await?))
}
