use anyhow::Context;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{Analysis, AnalysisResult, AnalysisStatus},
    prompt,
};
use crate::{
    error::ApiError,
    photos::{self, UploadItem},
    state::AppState,
};

pub const MAX_PHOTOS: usize = 5;

/// Loads an analysis, hiding rows that belong to someone else.
pub async fn find_owned(st: &AppState, user_id: Uuid, id: Uuid) -> Result<Analysis, ApiError> {
    st.analyses
        .find(id)
        .await?
        .filter(|a| a.user_id == user_id)
        .ok_or_else(|| ApiError::NotFound("Analysis not found".into()))
}

/// Stores 1..=5 photos and inserts the `pending` row that references them.
/// Photos are removed again when the row cannot be written.
#[instrument(skip(st, files), fields(photos = files.len()))]
pub async fn create_pending(
    st: &AppState,
    user_id: Uuid,
    files: Vec<UploadItem>,
) -> Result<Analysis, ApiError> {
    if files.is_empty() {
        return Err(ApiError::BadRequest("files[] is required".into()));
    }
    if files.len() > MAX_PHOTOS {
        return Err(ApiError::BadRequest(format!(
            "at most {MAX_PHOTOS} photos per analysis"
        )));
    }

    let analysis_id = Uuid::new_v4();
    let paths =
        photos::upload_analysis_photos(st.storage.as_ref(), user_id, analysis_id, files).await?;
    match st.analyses.create(analysis_id, user_id, &paths).await {
        Ok(analysis) => Ok(analysis),
        Err(e) => {
            warn!(%analysis_id, error = %e, "analysis insert failed; removing photos");
            photos::remove_photos(st.storage.as_ref(), &paths).await;
            Err(e.into())
        }
    }
}

/// Drives one analysis to a terminal status.
///
/// The row is marked `processing`, the photos are sent to the model, and the
/// validated result is written back as `completed`. Any failure after the row
/// entered `processing` marks it `failed` before the error is returned.
#[instrument(skip(st))]
pub async fn run_analysis(st: &AppState, user_id: Uuid, analysis_id: Uuid) -> Result<Analysis, ApiError> {
    let analysis = find_owned(st, user_id, analysis_id).await?;
    if analysis.status == AnalysisStatus::Completed {
        return Err(ApiError::Conflict("Analysis already completed".into()));
    }
    if analysis.photo_paths.is_empty() {
        return Err(ApiError::BadRequest("Analysis has no photos".into()));
    }

    st.analyses
        .set_status(analysis_id, AnalysisStatus::Processing)
        .await?;

    match analyze_and_store(st, &analysis).await {
        Ok(done) => {
            info!(%analysis_id, looks_score = ?done.looks_score, "analysis completed");
            Ok(done)
        }
        Err(e) => {
            warn!(%analysis_id, error = %e, "analysis failed");
            if let Err(mark_err) = st
                .analyses
                .set_status(analysis_id, AnalysisStatus::Failed)
                .await
            {
                warn!(%analysis_id, error = %mark_err, "could not mark analysis failed");
            }
            Err(e)
        }
    }
}

async fn analyze_and_store(st: &AppState, analysis: &Analysis) -> Result<Analysis, ApiError> {
    let mut images = Vec::with_capacity(analysis.photo_paths.len());
    for path in &analysis.photo_paths {
        let photo =
            photos::resolve_photo(st.storage.as_ref(), path, st.config.signed_url_ttl_secs).await?;
        debug!(path = %photo.path, signed_url = %photo.signed_url, "photo resolved");
        images.push(photo.data_url);
    }

    let args = st
        .inference
        .call_tool(&prompt::analysis_request(images))
        .await?;
    let result: AnalysisResult = serde_json::from_value(args).context("decode analysis result")?;
    let result = result.validate()?;

    Ok(st.analyses.complete(analysis.id, &result).await?)
}
