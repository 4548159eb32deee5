use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::dto::{NewPayment, Subscription, SubscriptionRow, SubscriptionStatus, SubscriptionUpsert};

#[async_trait]
pub trait BillingRepo: Send + Sync {
    /// `user_id` on the upsert must already be resolved.
    async fn upsert_subscription(&self, s: &SubscriptionUpsert) -> anyhow::Result<()>;
    /// Returns false when no row matched.
    async fn set_subscription_status(
        &self,
        provider_subscription_id: &str,
        status: SubscriptionStatus,
    ) -> anyhow::Result<bool>;
    /// Returns false when the event was already recorded.
    async fn insert_payment(&self, p: &NewPayment) -> anyhow::Result<bool>;
    async fn find_subscription(&self, provider_subscription_id: &str) -> anyhow::Result<Option<Subscription>>;
    /// Active or trialing rows win over newer inactive ones.
    async fn latest_for_user(&self, user_id: Uuid) -> anyhow::Result<Option<Subscription>>;
}

pub struct PgBillingRepo {
    db: PgPool,
}

impl PgBillingRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const COLUMNS: &str = "id, user_id, provider_customer_id, provider_subscription_id, plan_type, \
                       status, current_period_start, current_period_end, cancel_at_period_end, \
                       created_at, updated_at";

#[async_trait]
impl BillingRepo for PgBillingRepo {
    async fn upsert_subscription(&self, s: &SubscriptionUpsert) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                provider_subscription_id, provider_customer_id, plan_type, status,
                current_period_start, current_period_end, cancel_at_period_end, user_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (provider_subscription_id) DO UPDATE SET
                provider_customer_id = COALESCE(EXCLUDED.provider_customer_id, subscriptions.provider_customer_id),
                plan_type = EXCLUDED.plan_type,
                status = EXCLUDED.status,
                current_period_start = COALESCE(EXCLUDED.current_period_start, subscriptions.current_period_start),
                current_period_end = COALESCE(EXCLUDED.current_period_end, subscriptions.current_period_end),
                cancel_at_period_end = EXCLUDED.cancel_at_period_end,
                user_id = COALESCE(EXCLUDED.user_id, subscriptions.user_id),
                updated_at = now()
            "#,
        )
        .bind(&s.provider_subscription_id)
        .bind(&s.provider_customer_id)
        .bind(s.plan_type.as_str())
        .bind(s.status.as_str())
        .bind(s.current_period_start)
        .bind(s.current_period_end)
        .bind(s.cancel_at_period_end)
        .bind(s.user_id)
        .execute(&self.db)
        .await
        .context("upsert subscription")?;
        Ok(())
    }

    async fn set_subscription_status(
        &self,
        provider_subscription_id: &str,
        status: SubscriptionStatus,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE subscriptions
               SET status = $2, updated_at = now()
             WHERE provider_subscription_id = $1
            "#,
        )
        .bind(provider_subscription_id)
        .bind(status.as_str())
        .execute(&self.db)
        .await
        .context("update subscription status")?;
        Ok(res.rows_affected() > 0)
    }

    async fn insert_payment(&self, p: &NewPayment) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            INSERT INTO payments (
                provider_event_id, provider_payment_id, provider_customer_id,
                amount_cents, currency, status, user_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (provider_event_id) DO NOTHING
            "#,
        )
        .bind(&p.provider_event_id)
        .bind(&p.provider_payment_id)
        .bind(&p.provider_customer_id)
        .bind(p.amount_cents)
        .bind(&p.currency)
        .bind(p.status.as_str())
        .bind(p.user_id)
        .execute(&self.db)
        .await
        .context("insert payment")?;
        Ok(res.rows_affected() > 0)
    }

    async fn find_subscription(&self, provider_subscription_id: &str) -> anyhow::Result<Option<Subscription>> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {COLUMNS} FROM subscriptions WHERE provider_subscription_id = $1"
        ))
        .bind(provider_subscription_id)
        .fetch_optional(&self.db)
        .await
        .context("find subscription")?;
        Ok(row.map(Subscription::from))
    }

    async fn latest_for_user(&self, user_id: Uuid) -> anyhow::Result<Option<Subscription>> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            r#"
            SELECT {COLUMNS}
              FROM subscriptions
             WHERE user_id = $1
             ORDER BY status IN ('active', 'trialing') DESC, updated_at DESC
             LIMIT 1
            "#
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("latest subscription for user")?;
        Ok(row.map(Subscription::from))
    }
}
