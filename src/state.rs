use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::admin::{AdminRepo, PgAdminRepo};
use crate::analysis::{AnalysisRepo, PgAnalysisRepo};
use crate::auth::{PgUserRepo, UserRepo};
use crate::billing::{BillingRepo, PgBillingRepo};
use crate::config::AppConfig;
use crate::inference::{InferenceClient, OpenAiClient};
use crate::plan::{PgTaskRepo, TaskRepo};
use crate::storage::{Storage, StorageClient};

/// Everything a handler needs. External systems sit behind trait objects so
/// tests can swap in in-memory doubles.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageClient>,
    pub inference: Arc<dyn InferenceClient>,
    pub users: Arc<dyn UserRepo>,
    pub analyses: Arc<dyn AnalysisRepo>,
    pub tasks: Arc<dyn TaskRepo>,
    pub billing: Arc<dyn BillingRepo>,
    pub admin: Arc<dyn AdminRepo>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("run migrations")?;

        let storage = Arc::new(Storage::new(&config.storage).await?) as Arc<dyn StorageClient>;
        let inference =
            Arc::new(OpenAiClient::new(config.inference.clone())?) as Arc<dyn InferenceClient>;

        Ok(Self::with_postgres(db, config, storage, inference))
    }

    pub fn with_postgres(
        db: PgPool,
        config: Arc<AppConfig>,
        storage: Arc<dyn StorageClient>,
        inference: Arc<dyn InferenceClient>,
    ) -> Self {
        Self {
            config,
            storage,
            inference,
            users: Arc::new(PgUserRepo::new(db.clone())),
            analyses: Arc::new(PgAnalysisRepo::new(db.clone())),
            tasks: Arc::new(PgTaskRepo::new(db.clone())),
            billing: Arc::new(PgBillingRepo::new(db.clone())),
            admin: Arc::new(PgAdminRepo::new(db)),
        }
    }
}
