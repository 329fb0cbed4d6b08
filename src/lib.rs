//! User directory service: a Postgres-backed user repository and the
//! axum routes that expose it.

pub mod app;
pub mod config;
pub mod error;
pub mod state;
pub mod users;

pub use error::{UserError, UserResult};
