use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::dto::TableDeletion;

/// Tables holding per-user rows, purged before the `users` row itself.
pub const USER_TABLES: [(&str, &str); 4] = [
    ("tasks", "user_id"),
    ("analyses", "user_id"),
    ("payments", "user_id"),
    ("subscriptions", "user_id"),
];

#[async_trait]
pub trait AdminRepo: Send + Sync {
    /// Deletes every row owned by the user plus the account, all or nothing.
    /// The last entry of the result is the `users` row count.
    async fn purge_user(&self, user_id: Uuid) -> anyhow::Result<Vec<TableDeletion>>;
}

pub struct PgAdminRepo {
    db: PgPool,
}

impl PgAdminRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AdminRepo for PgAdminRepo {
    async fn purge_user(&self, user_id: Uuid) -> anyhow::Result<Vec<TableDeletion>> {
        let mut tx = self.db.begin().await.context("begin purge")?;
        let mut report = Vec::with_capacity(USER_TABLES.len() + 1);

        for (table, column) in USER_TABLES {
            let res = sqlx::query(&format!("DELETE FROM {table} WHERE {column} = $1"))
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("purge {table}"))?;
            report.push(TableDeletion {
                table: table.into(),
                column: column.into(),
                rows: res.rows_affected(),
            });
        }

        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .context("purge users")?;
        report.push(TableDeletion {
            table: "users".into(),
            column: "id".into(),
            rows: res.rows_affected(),
        });

        tx.commit().await.context("commit purge")?;
        Ok(report)
    }
}
