use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    Skincare,
    Hair,
    Body,
    Style,
    Teeth,
    Mindset,
}

impl TaskCategory {
    pub const ALL: [TaskCategory; 6] = [
        TaskCategory::Skincare,
        TaskCategory::Hair,
        TaskCategory::Body,
        TaskCategory::Style,
        TaskCategory::Teeth,
        TaskCategory::Mindset,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskCategory::Skincare => "skincare",
            TaskCategory::Hair => "hair",
            TaskCategory::Body => "body",
            TaskCategory::Style => "style",
            TaskCategory::Teeth => "teeth",
            TaskCategory::Mindset => "mindset",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

#[derive(Debug, FromRow)]
pub struct TaskRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category: String,
    pub title: String,
    pub description: String,
    pub priority: i32,
    pub completed: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category: TaskCategory,
    pub title: String,
    pub description: String,
    pub priority: i32,
    pub completed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl TryFrom<TaskRow> for Task {
    type Error = anyhow::Error;

    fn try_from(r: TaskRow) -> anyhow::Result<Self> {
        let category = TaskCategory::parse(&r.category)
            .ok_or_else(|| anyhow::anyhow!("unknown task category {:?}", r.category))?;
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            category,
            title: r.title,
            description: r.description,
            priority: r.priority,
            completed: r.completed,
            created_at: r.created_at,
        })
    }
}

pub const DEFAULT_PRIORITY: i32 = 2;

/// One task as produced by the `generate_plan` tool.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub category: TaskCategory,
    pub title: String,
    pub description: String,
    pub priority: i32,
}

impl NewTask {
    /// Lenient decode of one model-produced task. Returns `None` when the
    /// category is unknown or the title is missing. A null description is
    /// empty, and a fractional priority is rounded.
    pub fn from_value(v: &Value) -> Option<Self> {
        let category = v
            .get("category")
            .and_then(Value::as_str)
            .and_then(|c| TaskCategory::parse(&c.trim().to_lowercase()))?;
        let title = v.get("title").and_then(Value::as_str)?.to_string();
        let description = v
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let priority = match v.get("priority") {
            Some(p) => p
                .as_i64()
                .or_else(|| p.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64))
                .map(|p| p.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
                .unwrap_or(DEFAULT_PRIORITY),
            None => DEFAULT_PRIORITY,
        };
        Some(Self {
            category,
            title,
            description,
            priority,
        })
    }
}

/// Raw tool arguments; tasks are decoded one by one so a bad entry only
/// drops itself.
#[derive(Debug, Deserialize)]
pub struct GeneratedPlan {
    #[serde(default)]
    pub tasks: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub completed: bool,
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub success: bool,
    pub analysis_id: Uuid,
    pub tasks: Vec<Task>,
}
