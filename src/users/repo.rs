use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use tracing::{debug, error};

use crate::error::{
    pg_error_code, pg_error_detail, UserError, UserResult, INVALID_TEXT_REPRESENTATION,
    UNIQUE_VIOLATION,
};
use crate::users::repo_types::{NewUser, Page, PublicUser, User, UserChanges};
use crate::users::services::{name_prefix_pattern, today};

const USER_COLUMNS: &str = "user_id, name, email, password, created_at";
const PUBLIC_USER_COLUMNS: &str = "user_id, name, email, created_at";

/// Data access over the `users` table.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Newest users first, one page at a time, without credentials.
    async fn list_users(&self, page: Page) -> UserResult<Vec<PublicUser>>;

    /// Case-insensitive name prefix search; an empty prefix matches everyone.
    async fn search_users_by_name(&self, name: &str) -> UserResult<Vec<PublicUser>>;

    /// Inserts a user. A taken email is a `Conflict`.
    async fn create_user(&self, user: NewUser) -> UserResult<User>;

    /// `Ok(None)` when no user has this email.
    async fn find_user_by_email(&self, email: &str) -> UserResult<Option<User>>;

    /// Unknown and malformed identifiers are both `NotFound`.
    async fn find_user_by_id(&self, user_id: &str) -> UserResult<User>;

    /// Applies `changes`; no matching row is `Internal`.
    async fn update_user(&self, changes: UserChanges, user_id: &str) -> UserResult<User>;

    /// Physically removes the row and returns it; no matching row is `Internal`.
    async fn delete_user(&self, user_id: &str) -> UserResult<User>;

    /// Users whose `created_at` is at or after `since`.
    async fn count_new_users_since(&self, since: OffsetDateTime) -> UserResult<i64>;

    /// Replaces the stored (already hashed) password.
    async fn change_password(&self, password: &str, user_id: &str) -> UserResult<User>;

    /// Users created since the start of the current UTC day.
    async fn count_new_users_today(&self) -> UserResult<i64> {
        self.count_new_users_since(today()).await
    }
}

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn list_users(&self, page: Page) -> UserResult<Vec<PublicUser>> {
        let sql = format!(
            "SELECT {PUBLIC_USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        );
        let users = sqlx::query_as::<_, PublicUser>(&sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "error fetching all users");
                UserError::Internal("Error fetching all users".into())
            })?;
        debug!(page = page.page, limit = page.limit, count = users.len(), "listed users");
        Ok(users)
    }

    async fn search_users_by_name(&self, name: &str) -> UserResult<Vec<PublicUser>> {
        let sql = format!(
            "SELECT {PUBLIC_USER_COLUMNS} FROM users WHERE name ILIKE $1 ORDER BY created_at DESC"
        );
        let users = sqlx::query_as::<_, PublicUser>(&sql)
            .bind(name_prefix_pattern(name))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, name, "error finding users");
                UserError::Internal("Error finding users".into())
            })?;
        Ok(users)
    }

    async fn create_user(&self, user: NewUser) -> UserResult<User> {
        let sql = format!(
            "INSERT INTO users (name, email, password) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        );
        let created = sqlx::query_as::<_, User>(&sql)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, email = %user.email, "error creating user");
                match pg_error_code(&e).as_deref() {
                    Some(UNIQUE_VIOLATION) => UserError::Conflict(format!(
                        "User with Email \"{}\" already exists",
                        user.email
                    )),
                    _ => UserError::Internal("Error creating user".into()),
                }
            })?;
        debug!(user_id = %created.user_id, "user created");
        Ok(created)
    }

    async fn find_user_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, email, "error finding user by email");
                UserError::Internal("Error finding user by Email".into())
            })
    }

    async fn find_user_by_id(&self, user_id: &str) -> UserResult<User> {
        let not_found = || UserError::NotFound(format!("User with ID \"{user_id}\" not found"));
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1::uuid");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, user_id, "error finding user by id");
                match pg_error_code(&e).as_deref() {
                    Some(INVALID_TEXT_REPRESENTATION) => not_found(),
                    _ => UserError::Internal("Error finding user by Id".into()),
                }
            })?;
        user.ok_or_else(not_found)
    }

    async fn update_user(&self, changes: UserChanges, user_id: &str) -> UserResult<User> {
        if changes.is_empty() {
            error!(user_id, "error updating user: no fields to update");
            return Err(UserError::Internal(
                "Error updating user, no fields to update".into(),
            ));
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE users SET ");
        {
            let mut set = qb.separated(", ");
            if let Some(name) = changes.name {
                set.push("name = ").push_bind_unseparated(name);
            }
            if let Some(email) = changes.email {
                set.push("email = ").push_bind_unseparated(email);
            }
            if let Some(password) = changes.password {
                set.push("password = ").push_bind_unseparated(password);
            }
        }
        qb.push(" WHERE user_id = ")
            .push_bind(user_id.to_owned())
            .push("::uuid RETURNING ")
            .push(USER_COLUMNS);

        let updated = qb
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, user_id, "error updating user");
                UserError::Internal(format!("Error updating user, {}", pg_error_detail(&e)))
            })?;

        updated.ok_or_else(|| {
            error!(user_id, "error updating user: no row matched");
            UserError::Internal("Failed to update user".into())
        })
    }

    async fn delete_user(&self, user_id: &str) -> UserResult<User> {
        let sql = format!("DELETE FROM users WHERE user_id = $1::uuid RETURNING {USER_COLUMNS}");
        let deleted = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, user_id, "error deleting user");
                UserError::Internal("Error deleting user".into())
            })?;

        let deleted = deleted.ok_or_else(|| {
            error!(user_id, "error deleting user: no row matched");
            UserError::Internal("Failed to delete user".into())
        })?;
        debug!(user_id = %deleted.user_id, "user deleted");
        Ok(deleted)
    }

    async fn count_new_users_since(&self, since: OffsetDateTime) -> UserResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE created_at >= $1")
            .bind(since)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "error fetching new users today");
                UserError::Internal("Error fetching new users today".into())
            })
    }

    async fn change_password(&self, password: &str, user_id: &str) -> UserResult<User> {
        let sql = format!(
            "UPDATE users SET password = $1 WHERE user_id = $2::uuid RETURNING {USER_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, User>(&sql)
            .bind(password)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, user_id, "error changing password");
                UserError::Internal("Error changing password".into())
            })?;

        updated.ok_or_else(|| {
            error!(user_id, "error changing password: no row matched");
            UserError::Internal("Error changing password".into())
        })
    }
}
