mod admin;
mod analysis;
mod app;
mod auth;
mod billing;
mod config;
mod error;
mod inference;
mod photos;
mod plan;
mod state;
mod storage;
#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "glowcoach=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = state::AppState::init().await?;
    if state.config.billing.webhook_secret.is_none() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET not set; webhooks will be refused");
    }

    app::serve(app::build_app(state)).await
}
