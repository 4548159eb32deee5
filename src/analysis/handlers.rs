use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{
    dto::{
        Analysis, AnalysisPhotosResponse, AnalyzeRequest, CreatedAnalysisResponse, Pagination,
    },
    services::{create_pending, find_owned, run_analysis},
};
use crate::{
    auth::AuthUser,
    error::ApiError,
    photos::{self, UploadItem},
    state::AppState,
    storage::ANALYSIS_PHOTOS_BUCKET,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/analyses", get(list_analyses))
        .route("/analyses/latest", get(latest_analysis))
        .route("/analyses/:id", get(get_analysis))
        .route("/analyses/:id/photos", get(get_photo_urls))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/analyses", post(create_analysis))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
        .route("/functions/analyze-photos", post(analyze_photos))
}

#[instrument(skip(state))]
pub async fn list_analyses(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<Analysis>>, ApiError> {
    let limit = p.limit.clamp(1, 100);
    let offset = p.offset.max(0);
    Ok(Json(state.analyses.list_by_user(user_id, limit, offset).await?))
}

#[instrument(skip(state))]
pub async fn latest_analysis(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Analysis>, ApiError> {
    state
        .analyses
        .latest_completed(user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No completed analysis found".into()))
}

/// Polled by the client until the status is terminal.
#[instrument(skip(state))]
pub async fn get_analysis(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Analysis>, ApiError> {
    let analysis = find_owned(&state, user_id, id).await?;
    debug!(
        status = analysis.status.as_str(),
        terminal = analysis.status.is_terminal(),
        "analysis polled"
    );
    Ok(Json(analysis))
}

#[instrument(skip(state))]
pub async fn get_photo_urls(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AnalysisPhotosResponse>, ApiError> {
    let analysis = find_owned(&state, user_id, id).await?;
    let ttl = state.config.signed_url_ttl_secs;
    let urls = photos::presign_many(
        state.storage.as_ref(),
        ANALYSIS_PHOTOS_BUCKET,
        &analysis.photo_paths,
        ttl,
    )
    .await?;
    Ok(Json(AnalysisPhotosResponse {
        id,
        urls,
        expires_in: ttl,
    }))
}

/// POST /analyses (multipart, field `files` or `files[]`)
#[instrument(skip(state, mp))]
pub async fn create_analysis(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> Result<(StatusCode, Json<CreatedAnalysisResponse>), ApiError> {
    let mut files = Vec::new();
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let name = field.name().map(|s| s.to_string());
        if name.as_deref() != Some("files") && name.as_deref() != Some("files[]") {
            continue;
        }
        let content_type = field.content_type().unwrap_or("image/jpeg").to_string();
        if !photos::is_supported_image(&content_type) {
            return Err(ApiError::BadRequest(format!(
                "unsupported image type {content_type}"
            )));
        }
        let body = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        files.push(UploadItem { body, content_type });
    }

    let analysis = create_pending(&state, user_id, files).await?;
    info!(%user_id, analysis_id = %analysis.id, photos = analysis.photo_paths.len(), "analysis created");
    Ok((
        StatusCode::CREATED,
        Json(CreatedAnalysisResponse {
            id: analysis.id,
            status: analysis.status,
            photo_paths: analysis.photo_paths,
        }),
    ))
}

/// POST /functions/analyze-photos { "analysisId": "..." }
#[instrument(skip(state, body))]
pub async fn analyze_photos(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<AnalyzeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let analysis = run_analysis(&state, user_id, body.analysis_id).await?;
    Ok(Json(serde_json::json!({ "success": true, "analysis": analysis })))
}
