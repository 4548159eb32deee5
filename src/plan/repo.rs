use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::dto::{NewTask, Task, TaskRow};

#[async_trait]
pub trait TaskRepo: Send + Sync {
    /// Deletes every task of the user and inserts `tasks` in their place.
    async fn replace_for_user(&self, user_id: Uuid, tasks: &[NewTask]) -> anyhow::Result<Vec<Task>>;
    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Task>>;
    async fn set_completed(&self, user_id: Uuid, task_id: Uuid, completed: bool) -> anyhow::Result<Option<Task>>;
}

pub struct PgTaskRepo {
    db: PgPool,
}

impl PgTaskRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

async fn insert_task_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    task: &NewTask,
) -> anyhow::Result<Task> {
    let row = sqlx::query_as::<_, TaskRow>(
        r#"
        INSERT INTO tasks (user_id, category, title, description, priority)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, user_id, category, title, description, priority, completed, created_at
        "#,
    )
    .bind(user_id)
    .bind(task.category.as_str())
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.priority)
    .fetch_one(&mut **tx)
    .await
    .context("insert task")?;
    row.try_into()
}

#[async_trait]
impl TaskRepo for PgTaskRepo {
    async fn replace_for_user(&self, user_id: Uuid, tasks: &[NewTask]) -> anyhow::Result<Vec<Task>> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        sqlx::query("DELETE FROM tasks WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .context("delete previous tasks")?;

        let mut out = Vec::with_capacity(tasks.len());
        for t in tasks {
            out.push(insert_task_tx(&mut tx, user_id, t).await?);
        }
        tx.commit().await.context("commit tx")?;
        Ok(out)
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, user_id, category, title, description, priority, completed, created_at
              FROM tasks
             WHERE user_id = $1
             ORDER BY priority ASC, created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list tasks")?;
        rows.into_iter().map(Task::try_from).collect()
    }

    async fn set_completed(&self, user_id: Uuid, task_id: Uuid, completed: bool) -> anyhow::Result<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            UPDATE tasks
               SET completed = $3
             WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, category, title, description, priority, completed, created_at
            "#,
        )
        .bind(task_id)
        .bind(user_id)
        .bind(completed)
        .fetch_optional(&self.db)
        .await
        .context("update task")?;
        row.map(Task::try_from).transpose()
    }
}
