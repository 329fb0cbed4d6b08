use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    error::{UserError, UserResult},
    state::AppState,
    users::{
        dto::{
            ChangePasswordRequest, CountResponse, CreateUserRequest, EmailQuery, Pagination,
            SearchQuery, UpdateUserRequest,
        },
        password::hash_password,
        repo_types::{NewUser, Page, PublicUser, User, UserChanges},
        services::{is_valid_email, normalize_email},
    },
};

const MIN_PASSWORD_LEN: usize = 8;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/search", get(search_users))
        .route("/users/by-email", get(find_user_by_email))
        .route("/users/stats/new-today", get(new_users_today))
        .route(
            "/users/:id",
            get(find_user_by_id).patch(update_user).delete(delete_user),
        )
        .route("/users/:id/password", put(change_password))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    Query(p): Query<Pagination>,
) -> UserResult<Json<Vec<PublicUser>>> {
    let paging = &state.config.paging;
    let limit = p
        .limit
        .unwrap_or(paging.default_page_size)
        .min(paging.max_page_size);
    let users = state.users.list_users(Page::new(p.page, limit)).await?;
    Ok(Json(users))
}

#[instrument(skip(state))]
pub async fn search_users(
    State(state): State<AppState>,
    Query(q): Query<SearchQuery>,
) -> UserResult<Json<Vec<PublicUser>>> {
    let users = state.users.search_users_by_name(q.name.trim()).await?;
    Ok(Json(users))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> UserResult<(StatusCode, Json<User>)> {
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        warn!("empty name");
        return Err(UserError::Invalid("Name is required".into()));
    }
    let email = valid_email(&payload.email)?;
    let password = hashed_password(&payload.password)?;

    let user = state
        .users
        .create_user(NewUser {
            name,
            email,
            password,
        })
        .await?;

    info!(user_id = %user.user_id, email = %user.email, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state))]
pub async fn find_user_by_email(
    State(state): State<AppState>,
    Query(q): Query<EmailQuery>,
) -> UserResult<Json<User>> {
    let email = normalize_email(&q.email);
    match state.users.find_user_by_email(&email).await? {
        Some(user) => Ok(Json(user)),
        None => Err(UserError::NotFound(format!(
            "User with Email \"{email}\" not found"
        ))),
    }
}

#[instrument(skip(state))]
pub async fn find_user_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> UserResult<Json<User>> {
    let user = state.users.find_user_by_id(&id).await?;
    Ok(Json(user))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> UserResult<Json<User>> {
    let mut changes = UserChanges::default();
    if let Some(name) = payload.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(UserError::Invalid("Name must not be empty".into()));
        }
        changes.name = Some(name);
    }
    if let Some(email) = payload.email {
        changes.email = Some(valid_email(&email)?);
    }
    if let Some(password) = payload.password {
        changes.password = Some(hashed_password(&password)?);
    }
    if changes.is_empty() {
        warn!(user_id = %id, "update without fields");
        return Err(UserError::Invalid("No fields to update".into()));
    }

    let user = state.users.update_user(changes, &id).await?;
    info!(user_id = %user.user_id, "user updated");
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> UserResult<Json<User>> {
    let user = state.users.delete_user(&id).await?;
    info!(user_id = %user.user_id, "user deleted");
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn new_users_today(State(state): State<AppState>) -> UserResult<Json<CountResponse>> {
    let count = state.users.count_new_users_today().await?;
    Ok(Json(CountResponse { count }))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ChangePasswordRequest>,
) -> UserResult<Json<User>> {
    let password = hashed_password(&payload.password)?;
    let user = state.users.change_password(&password, &id).await?;
    info!(user_id = %user.user_id, "password changed");
    Ok(Json(user))
}

fn valid_email(raw: &str) -> UserResult<String> {
    let email = normalize_email(raw);
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(UserError::Invalid("Invalid email".into()));
    }
    Ok(email)
}

fn hashed_password(plain: &str) -> UserResult<String> {
    if plain.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(UserError::Invalid("Password too short".into()));
    }
    hash_password(plain).map_err(|e| {
        error!(error = %e, "hash_password failed");
        UserError::Internal("Error hashing password".into())
    })
}
