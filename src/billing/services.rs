use anyhow::Context;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::dto::{
    metadata_user_id, BillingAction, CheckoutSession, Invoice, NewPayment, PaymentStatus, PlanType,
    ProviderSubscription, SubscriptionStatus, SubscriptionUpsert, WebhookEvent,
};
use crate::{auth::services::normalize_email, state::AppState};

fn unix(ts: Option<i64>) -> Option<OffsetDateTime> {
    ts.and_then(|t| OffsetDateTime::from_unix_timestamp(t).ok())
}

fn object<T: serde::de::DeserializeOwned>(event: &WebhookEvent) -> anyhow::Result<T> {
    serde_json::from_value(event.data.object.clone())
        .with_context(|| format!("decode {} payload", event.event_type))
}

/// Maps one provider event to the store mutations it implies. Unknown event
/// types map to no actions.
pub fn actions_for_event(event: &WebhookEvent) -> anyhow::Result<Vec<BillingAction>> {
    let actions = match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session: CheckoutSession = object(event)?;
            checkout_actions(&event.id, session)?
        }
        "customer.subscription.created" | "customer.subscription.updated" => {
            let sub: ProviderSubscription = object(event)?;
            vec![BillingAction::UpsertSubscription(SubscriptionUpsert {
                user_id: metadata_user_id(&sub.metadata),
                status: SubscriptionStatus::parse(&sub.status),
                current_period_start: unix(sub.current_period_start),
                current_period_end: unix(sub.current_period_end),
                cancel_at_period_end: sub.cancel_at_period_end,
                provider_customer_id: sub.customer,
                provider_subscription_id: sub.id,
                plan_type: PlanType::Premium,
                customer_email: None,
            })]
        }
        "customer.subscription.deleted" => {
            let sub: ProviderSubscription = object(event)?;
            vec![BillingAction::SetSubscriptionStatus {
                provider_subscription_id: sub.id,
                status: SubscriptionStatus::Canceled,
            }]
        }
        "invoice.paid" => {
            let invoice: Invoice = object(event)?;
            vec![BillingAction::RecordPayment(invoice_payment(
                &event.id,
                invoice,
                PaymentStatus::Succeeded,
            ))]
        }
        "invoice.payment_failed" => {
            let invoice: Invoice = object(event)?;
            let mut actions = Vec::with_capacity(2);
            if let Some(sub_id) = invoice.subscription.clone() {
                actions.push(BillingAction::SetSubscriptionStatus {
                    provider_subscription_id: sub_id,
                    status: SubscriptionStatus::PastDue,
                });
            }
            actions.push(BillingAction::RecordPayment(invoice_payment(
                &event.id,
                invoice,
                PaymentStatus::Failed,
            )));
            actions
        }
        _ => Vec::new(),
    };
    Ok(actions)
}

fn checkout_actions(event_id: &str, session: CheckoutSession) -> anyhow::Result<Vec<BillingAction>> {
    let email = session.email();
    let user_id = metadata_user_id(&session.metadata);

    match session.mode.as_deref() {
        // one-time lifetime purchase, stored as a pseudo-subscription
        Some("payment") => Ok(vec![
            BillingAction::UpsertSubscription(SubscriptionUpsert {
                provider_subscription_id: format!("lifetime_{}", session.id),
                provider_customer_id: session.customer.clone(),
                plan_type: PlanType::Lifetime,
                status: SubscriptionStatus::Active,
                current_period_start: None,
                current_period_end: None,
                cancel_at_period_end: false,
                user_id,
                customer_email: email.clone(),
            }),
            BillingAction::RecordPayment(NewPayment {
                provider_event_id: event_id.to_string(),
                provider_payment_id: session.payment_intent.clone().unwrap_or(session.id),
                provider_customer_id: session.customer,
                amount_cents: session.amount_total.unwrap_or(0),
                currency: session.currency.unwrap_or_else(|| "eur".into()),
                status: PaymentStatus::Succeeded,
                user_id,
                customer_email: email,
            }),
        ]),
        Some("subscription") => {
            let sub_id = session
                .subscription
                .context("subscription checkout without subscription id")?;
            Ok(vec![BillingAction::UpsertSubscription(SubscriptionUpsert {
                provider_subscription_id: sub_id,
                provider_customer_id: session.customer,
                plan_type: PlanType::Premium,
                status: SubscriptionStatus::Active,
                current_period_start: None,
                current_period_end: None,
                cancel_at_period_end: false,
                user_id,
                customer_email: email,
            })])
        }
        other => {
            debug!(mode = ?other, "checkout mode ignored");
            Ok(Vec::new())
        }
    }
}

fn invoice_payment(event_id: &str, invoice: Invoice, status: PaymentStatus) -> NewPayment {
    let amount = match status {
        PaymentStatus::Succeeded => invoice.amount_paid,
        PaymentStatus::Failed => invoice.amount_due,
    };
    NewPayment {
        provider_event_id: event_id.to_string(),
        provider_payment_id: invoice.payment_intent.unwrap_or(invoice.id),
        provider_customer_id: invoice.customer,
        amount_cents: amount.unwrap_or(0),
        currency: invoice.currency.unwrap_or_else(|| "eur".into()),
        status,
        user_id: None,
        customer_email: invoice.customer_email,
    }
}

async fn resolve_user(
    st: &AppState,
    user_id: Option<Uuid>,
    email: Option<&str>,
) -> anyhow::Result<Option<Uuid>> {
    if user_id.is_some() {
        return Ok(user_id);
    }
    let Some(email) = email else {
        return Ok(None);
    };
    let user = st.users.find_by_email(&normalize_email(email)).await?;
    if user.is_none() {
        warn!(email = %email, "no user for billing email");
    }
    Ok(user.map(|u| u.id))
}

pub async fn apply_action(st: &AppState, action: BillingAction) -> anyhow::Result<()> {
    match action {
        BillingAction::UpsertSubscription(mut s) => {
            s.user_id = resolve_user(st, s.user_id, s.customer_email.as_deref()).await?;
            st.billing.upsert_subscription(&s).await?;
            info!(
                subscription = %s.provider_subscription_id,
                status = s.status.as_str(),
                plan = s.plan_type.as_str(),
                "subscription upserted"
            );
        }
        BillingAction::SetSubscriptionStatus {
            provider_subscription_id,
            status,
        } => {
            let matched = st
                .billing
                .set_subscription_status(&provider_subscription_id, status)
                .await?;
            if matched {
                info!(subscription = %provider_subscription_id, status = status.as_str(), "subscription status set");
            } else {
                warn!(subscription = %provider_subscription_id, "status update for unknown subscription");
            }
        }
        BillingAction::RecordPayment(mut p) => {
            p.user_id = resolve_user(st, p.user_id, p.customer_email.as_deref()).await?;
            if st.billing.insert_payment(&p).await? {
                info!(payment = %p.provider_payment_id, status = p.status.as_str(), "payment recorded");
            } else {
                debug!(event = %p.provider_event_id, "payment already recorded");
            }
        }
    }
    Ok(())
}

/// Applies every action of a verified event in order.
#[instrument(skip(st, event), fields(event_id = %event.id, event_type = %event.event_type))]
pub async fn handle_event(st: &AppState, event: &WebhookEvent) -> anyhow::Result<()> {
    let actions = actions_for_event(event)?;
    if actions.is_empty() {
        info!("event ignored");
        return Ok(());
    }
    for action in actions {
        apply_action(st, action).await?;
    }
    Ok(())
}
