use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

#[cfg(test)]
pub(crate) mod fake;

pub use repo::{UserRepository, UserStore};
pub use repo_types::{NewUser, Page, PublicUser, User, UserChanges};

pub fn router() -> Router<AppState> {
    handlers::user_routes()
}
