mod dto;
pub mod handlers;
mod prompt;
pub mod repo;
pub mod services;

pub use dto::{Analysis, AnalysisResult, AnalysisStatus};
pub use repo::{AnalysisRepo, PgAnalysisRepo};

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}
