mod dto;
pub mod handlers;
mod prompt;
pub mod repo;
pub mod services;

pub use dto::{NewTask, Task, TaskCategory};
pub use repo::{PgTaskRepo, TaskRepo};

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
