use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Lifecycle of an analysis row: `pending → processing → completed | failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Processing => "processing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        Ok(match s {
            "pending" => AnalysisStatus::Pending,
            "processing" => AnalysisStatus::Processing,
            "completed" => AnalysisStatus::Completed,
            "failed" => AnalysisStatus::Failed,
            other => anyhow::bail!("unknown analysis status {other:?}"),
        })
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Failed)
    }
}

#[derive(Debug, FromRow)]
pub struct AnalysisRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub photo_paths: Vec<String>,
    pub status: String,
    pub looks_score: Option<f64>,
    pub strengths: Option<Vec<String>>,
    pub weaknesses: Option<Vec<String>>,
    pub priorities: Option<Vec<String>>,
    pub detail_results: Option<Value>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub id: Uuid,
    pub user_id: Uuid,
    pub photo_paths: Vec<String>,
    pub status: AnalysisStatus,
    pub looks_score: Option<f64>,
    pub strengths: Option<Vec<String>>,
    pub weaknesses: Option<Vec<String>>,
    pub priorities: Option<Vec<String>>,
    pub detail_results: Option<Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl TryFrom<AnalysisRow> for Analysis {
    type Error = anyhow::Error;

    fn try_from(r: AnalysisRow) -> anyhow::Result<Self> {
        Ok(Self {
            status: AnalysisStatus::parse(&r.status)?,
            id: r.id,
            user_id: r.user_id,
            photo_paths: r.photo_paths,
            looks_score: r.looks_score,
            strengths: r.strengths,
            weaknesses: r.weaknesses,
            priorities: r.priorities,
            detail_results: r.detail_results,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Arguments of the `submit_analysis` tool call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalysisResult {
    pub looks_score: f64,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub priorities: Vec<String>,
    #[serde(default)]
    pub detail_results: Option<Value>,
}

pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 10.0;

fn clean_list(name: &str, items: Vec<String>) -> anyhow::Result<Vec<String>> {
    let cleaned: Vec<String> = items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    anyhow::ensure!(!cleaned.is_empty(), "model returned no {name}");
    Ok(cleaned)
}

impl AnalysisResult {
    /// Normalizes a model answer into something safe to mark `completed`:
    /// score clamped to [1, 10] with one decimal, non-empty lists,
    /// details kept only when they are an object.
    pub fn validate(self) -> anyhow::Result<Self> {
        anyhow::ensure!(
            self.looks_score.is_finite(),
            "model returned a non-numeric score"
        );
        let looks_score = (self.looks_score.clamp(MIN_SCORE, MAX_SCORE) * 10.0).round() / 10.0;

        Ok(Self {
            looks_score,
            strengths: clean_list("strengths", self.strengths)?,
            weaknesses: clean_list("weaknesses", self.weaknesses)?,
            priorities: clean_list("priorities", self.priorities)?,
            detail_results: self.detail_results.filter(Value::is_object),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub analysis_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CreatedAnalysisResponse {
    pub id: Uuid,
    pub status: AnalysisStatus,
    pub photo_paths: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalysisPhotosResponse {
    pub id: Uuid,
    pub urls: Vec<String>,
    pub expires_in: u64,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_limit() -> i64 { 20 }
