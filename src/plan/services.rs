use anyhow::Context;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{GeneratedPlan, NewTask, PlanResponse},
    prompt::{self, MIN_TASKS},
};
use crate::{error::ApiError, state::AppState};

/// Decodes each raw task, skipping entries that do not fit the task shape.
pub fn decode_tasks(raw: Vec<Value>) -> Vec<NewTask> {
    let total = raw.len();
    let tasks: Vec<NewTask> = raw.iter().filter_map(NewTask::from_value).collect();
    if tasks.len() < total {
        debug!(dropped = total - tasks.len(), "invalid plan tasks skipped");
    }
    tasks
}

/// Trims titles, drops untitled tasks and clamps priorities to 1..=3.
pub fn normalize_tasks(tasks: Vec<NewTask>) -> Vec<NewTask> {
    tasks
        .into_iter()
        .filter_map(|t| {
            let title = t.title.trim().to_string();
            if title.is_empty() {
                return None;
            }
            Some(NewTask {
                title,
                description: t.description.trim().to_string(),
                priority: t.priority.clamp(1, 3),
                category: t.category,
            })
        })
        .collect()
}

/// Builds a fresh plan from the caller's latest completed analysis.
///
/// The previous tasks are only replaced after the model answered with a
/// usable plan, so a failed generation leaves them untouched.
#[instrument(skip(st))]
pub async fn generate_plan(st: &AppState, user_id: Uuid) -> Result<PlanResponse, ApiError> {
    let analysis = st
        .analyses
        .latest_completed(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No completed analysis found".into()))?;

    let args = st
        .inference
        .call_tool(&prompt::plan_request(&analysis))
        .await?;
    let plan: GeneratedPlan = serde_json::from_value(args).context("decode generated plan")?;

    let tasks = normalize_tasks(decode_tasks(plan.tasks));
    if tasks.is_empty() {
        return Err(anyhow::anyhow!("model returned an empty plan").into());
    }
    if tasks.len() < MIN_TASKS {
        warn!(%user_id, count = tasks.len(), "plan shorter than requested");
    }

    let stored = st.tasks.replace_for_user(user_id, &tasks).await?;
    info!(%user_id, analysis_id = %analysis.id, tasks = stored.len(), "plan generated");

    Ok(PlanResponse {
        success: true,
        analysis_id: analysis.id,
        tasks: stored,
    })
}
