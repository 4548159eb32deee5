use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

// ---- provider payloads ----

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub mode: Option<String>,
    pub customer: Option<String>,
    pub subscription: Option<String>,
    pub customer_email: Option<String>,
    pub customer_details: Option<CustomerDetails>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub payment_intent: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
}

impl CheckoutSession {
    pub fn email(&self) -> Option<String> {
        self.customer_details
            .as_ref()
            .and_then(|d| d.email.clone())
            .or_else(|| self.customer_email.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSubscription {
    pub id: String,
    pub customer: Option<String>,
    pub status: String,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub customer: Option<String>,
    pub subscription: Option<String>,
    pub customer_email: Option<String>,
    pub amount_paid: Option<i64>,
    pub amount_due: Option<i64>,
    pub currency: Option<String>,
    pub payment_intent: Option<String>,
}

pub fn metadata_user_id(metadata: &Option<HashMap<String, String>>) -> Option<Uuid> {
    metadata
        .as_ref()
        .and_then(|m| m.get("user_id"))
        .and_then(|v| Uuid::parse_str(v).ok())
}

// ---- domain ----

/// Mirrors the provider's subscription states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Unpaid,
    Incomplete,
    IncompleteExpired,
    Paused,
}

impl SubscriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Unpaid => "unpaid",
            SubscriptionStatus::Incomplete => "incomplete",
            SubscriptionStatus::IncompleteExpired => "incomplete_expired",
            SubscriptionStatus::Paused => "paused",
        }
    }

    /// Unknown provider states are treated as `incomplete`.
    pub fn parse(s: &str) -> Self {
        match s {
            "active" => SubscriptionStatus::Active,
            "trialing" => SubscriptionStatus::Trialing,
            "past_due" => SubscriptionStatus::PastDue,
            "canceled" => SubscriptionStatus::Canceled,
            "unpaid" => SubscriptionStatus::Unpaid,
            "incomplete_expired" => SubscriptionStatus::IncompleteExpired,
            "paused" => SubscriptionStatus::Paused,
            _ => SubscriptionStatus::Incomplete,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Premium,
    Lifetime,
}

impl PlanType {
    pub fn as_str(self) -> &'static str {
        match self {
            PlanType::Premium => "premium",
            PlanType::Lifetime => "lifetime",
        }
    }

    pub fn parse(s: &str) -> Self {
        if s == "lifetime" {
            PlanType::Lifetime
        } else {
            PlanType::Premium
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Succeeded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
        }
    }
}

/// Insert-or-update keyed on `provider_subscription_id`. `None` fields keep
/// whatever the stored row already has.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionUpsert {
    pub provider_subscription_id: String,
    pub provider_customer_id: Option<String>,
    pub plan_type: PlanType,
    pub status: SubscriptionStatus,
    pub current_period_start: Option<OffsetDateTime>,
    pub current_period_end: Option<OffsetDateTime>,
    pub cancel_at_period_end: bool,
    pub user_id: Option<Uuid>,
    pub customer_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub provider_event_id: String,
    pub provider_payment_id: String,
    pub provider_customer_id: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub user_id: Option<Uuid>,
    pub customer_email: Option<String>,
}

/// Store mutation derived from one webhook event.
#[derive(Debug, Clone, PartialEq)]
pub enum BillingAction {
    UpsertSubscription(SubscriptionUpsert),
    SetSubscriptionStatus {
        provider_subscription_id: String,
        status: SubscriptionStatus,
    },
    RecordPayment(NewPayment),
}

#[derive(Debug, FromRow)]
pub struct SubscriptionRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub provider_customer_id: Option<String>,
    pub provider_subscription_id: String,
    pub plan_type: String,
    pub status: String,
    pub current_period_start: Option<OffsetDateTime>,
    pub current_period_end: Option<OffsetDateTime>,
    pub cancel_at_period_end: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub provider_customer_id: Option<String>,
    pub provider_subscription_id: String,
    pub plan_type: PlanType,
    pub status: SubscriptionStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub current_period_start: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub current_period_end: Option<OffsetDateTime>,
    pub cancel_at_period_end: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Subscription {
    pub fn is_premium(&self) -> bool {
        match self.plan_type {
            PlanType::Lifetime => self.status == SubscriptionStatus::Active,
            PlanType::Premium => matches!(
                self.status,
                SubscriptionStatus::Active | SubscriptionStatus::Trialing
            ),
        }
    }
}

impl From<SubscriptionRow> for Subscription {
    fn from(r: SubscriptionRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            provider_customer_id: r.provider_customer_id,
            provider_subscription_id: r.provider_subscription_id,
            plan_type: PlanType::parse(&r.plan_type),
            status: SubscriptionStatus::parse(&r.status),
            current_period_start: r.current_period_start,
            current_period_end: r.current_period_end,
            cancel_at_period_end: r.cancel_at_period_end,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub is_premium: bool,
    pub subscription: Option<Subscription>,
}
