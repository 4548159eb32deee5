mod dto;
pub mod handlers;
pub mod repo;
pub mod services;
pub mod webhook;

pub use dto::{
    NewPayment, PaymentStatus, PlanType, Subscription, SubscriptionStatus, SubscriptionUpsert,
};
pub use repo::{BillingRepo, PgBillingRepo};

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
