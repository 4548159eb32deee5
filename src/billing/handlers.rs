use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde_json::{json, Value};
use time::OffsetDateTime;
use tracing::{error, instrument, warn};

use super::{
    dto::{SubscriptionResponse, WebhookEvent},
    services::handle_event,
    webhook::{verify_signature, SIGNATURE_HEADER},
};
use crate::{auth::AuthUser, error::ApiError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/webhooks/stripe", post(stripe_webhook))
        .route("/billing/subscription", get(my_subscription))
}

/// Unverified events are never processed: without a configured secret the
/// handler answers 500 so the provider keeps the event for redelivery.
#[instrument(skip(state, headers, body))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let Some(secret) = state.config.billing.webhook_secret.as_deref() else {
        error!("STRIPE_WEBHOOK_SECRET not configured; refusing webhook");
        return Err(anyhow::anyhow!("webhook secret not configured").into());
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("missing stripe-signature header".into()))?;

    let now = OffsetDateTime::now_utc().unix_timestamp();
    if let Err(e) = verify_signature(
        &body,
        signature,
        secret,
        now,
        state.config.billing.signature_tolerance_secs,
    ) {
        warn!(error = %e, "webhook signature rejected");
        return Err(ApiError::BadRequest(format!("invalid signature: {e}")));
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid event payload: {e}")))?;

    handle_event(&state, &event).await?;
    Ok(Json(json!({ "received": true })))
}

#[instrument(skip(state))]
pub async fn my_subscription(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    let subscription = state.billing.latest_for_user(user_id).await?;
    Ok(Json(SubscriptionResponse {
        is_premium: subscription.as_ref().is_some_and(|s| s.is_premium()),
        subscription,
    }))
}
