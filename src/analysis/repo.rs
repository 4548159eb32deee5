use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::dto::{Analysis, AnalysisResult, AnalysisRow, AnalysisStatus};

#[async_trait]
pub trait AnalysisRepo: Send + Sync {
    async fn create(&self, id: Uuid, user_id: Uuid, photo_paths: &[String]) -> anyhow::Result<Analysis>;
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Analysis>>;
    async fn list_by_user(&self, user_id: Uuid, limit: i64, offset: i64) -> anyhow::Result<Vec<Analysis>>;
    async fn latest_completed(&self, user_id: Uuid) -> anyhow::Result<Option<Analysis>>;
    async fn set_status(&self, id: Uuid, status: AnalysisStatus) -> anyhow::Result<()>;
    /// Writes every result field and flips the row to `completed`.
    async fn complete(&self, id: Uuid, result: &AnalysisResult) -> anyhow::Result<Analysis>;
}

pub struct PgAnalysisRepo {
    db: PgPool,
}

impl PgAnalysisRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const COLUMNS: &str = "id, user_id, photo_paths, status, looks_score, strengths, weaknesses, \
                       priorities, detail_results, created_at, updated_at";

#[async_trait]
impl AnalysisRepo for PgAnalysisRepo {
    async fn create(&self, id: Uuid, user_id: Uuid, photo_paths: &[String]) -> anyhow::Result<Analysis> {
        let row = sqlx::query_as::<_, AnalysisRow>(&format!(
            r#"
            INSERT INTO analyses (id, user_id, photo_paths, status)
            VALUES ($1, $2, $3, 'pending')
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(photo_paths)
        .fetch_one(&self.db)
        .await
        .context("insert analysis")?;
        row.try_into()
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Analysis>> {
        let row = sqlx::query_as::<_, AnalysisRow>(&format!(
            "SELECT {COLUMNS} FROM analyses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("get analysis")?;
        row.map(Analysis::try_from).transpose()
    }

    async fn list_by_user(&self, user_id: Uuid, limit: i64, offset: i64) -> anyhow::Result<Vec<Analysis>> {
        let rows = sqlx::query_as::<_, AnalysisRow>(&format!(
            r#"
            SELECT {COLUMNS}
              FROM analyses
             WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list analyses")?;
        rows.into_iter().map(Analysis::try_from).collect()
    }

    async fn latest_completed(&self, user_id: Uuid) -> anyhow::Result<Option<Analysis>> {
        let row = sqlx::query_as::<_, AnalysisRow>(&format!(
            r#"
            SELECT {COLUMNS}
              FROM analyses
             WHERE user_id = $1 AND status = 'completed'
             ORDER BY created_at DESC
             LIMIT 1
            "#
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("latest completed analysis")?;
        row.map(Analysis::try_from).transpose()
    }

    async fn set_status(&self, id: Uuid, status: AnalysisStatus) -> anyhow::Result<()> {
        sqlx::query("UPDATE analyses SET status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.db)
            .await
            .with_context(|| format!("set analysis status {}", status.as_str()))?;
        Ok(())
    }

    async fn complete(&self, id: Uuid, result: &AnalysisResult) -> anyhow::Result<Analysis> {
        let row = sqlx::query_as::<_, AnalysisRow>(&format!(
            r#"
            UPDATE analyses
               SET status = 'completed',
                   looks_score = $2,
                   strengths = $3,
                   weaknesses = $4,
                   priorities = $5,
                   detail_results = $6,
                   updated_at = now()
             WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(result.looks_score)
        .bind(&result.strengths)
        .bind(&result.weaknesses)
        .bind(&result.priorities)
        .bind(&result.detail_results)
        .fetch_one(&self.db)
        .await
        .context("store analysis result")?;
        row.try_into()
    }
}
