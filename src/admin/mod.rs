mod dto;
pub mod handlers;
pub mod repo;
pub mod services;

pub use dto::TableDeletion;
pub use repo::{AdminRepo, PgAdminRepo, USER_TABLES};

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
