//! In-memory `UserStore` mirroring the Postgres repository's outcomes.

use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{UserError, UserResult};
use crate::users::repo::UserStore;
use crate::users::repo_types::{NewUser, Page, PublicUser, User, UserChanges};

#[derive(Default)]
pub struct FakeUserStore {
    users: Mutex<Vec<User>>,
}

impl FakeUserStore {
    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            users: Mutex::new(users),
        }
    }

    fn newest_first(&self) -> Vec<User> {
        let mut users = self.users.lock().unwrap().clone();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        users
    }
}

#[async_trait]
impl UserStore for FakeUserStore {
    async fn list_users(&self, page: Page) -> UserResult<Vec<PublicUser>> {
        Ok(self
            .newest_first()
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .map(PublicUser::from)
            .collect())
    }

    async fn search_users_by_name(&self, name: &str) -> UserResult<Vec<PublicUser>> {
        let prefix = name.to_lowercase();
        Ok(self
            .newest_first()
            .into_iter()
            .filter(|u| u.name.to_lowercase().starts_with(&prefix))
            .map(PublicUser::from)
            .collect())
    }

    async fn create_user(&self, user: NewUser) -> UserResult<User> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(UserError::Conflict(format!(
                "User with Email \"{}\" already exists",
                user.email
            )));
        }
        let created = User {
            user_id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password: user.password,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn find_user_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, user_id: &str) -> UserResult<User> {
        let users = self.users.lock().unwrap();
        Uuid::parse_str(user_id)
            .ok()
            .and_then(|id| users.iter().find(|u| u.user_id == id).cloned())
            .ok_or_else(|| UserError::NotFound(format!("User with ID \"{user_id}\" not found")))
    }

    async fn update_user(&self, changes: UserChanges, user_id: &str) -> UserResult<User> {
        if changes.is_empty() {
            return Err(UserError::Internal(
                "Error updating user, no fields to update".into(),
            ));
        }
        let id = Uuid::parse_str(user_id)
            .map_err(|_| UserError::Internal("Error updating user, invalid id".into()))?;
        let mut users = self.users.lock().unwrap();
        if let Some(email) = &changes.email {
            if users.iter().any(|u| &u.email == email && u.user_id != id) {
                return Err(UserError::Internal(
                    "Error updating user, duplicate email".into(),
                ));
            }
        }
        let user = users
            .iter_mut()
            .find(|u| u.user_id == id)
            .ok_or_else(|| UserError::Internal("Failed to update user".into()))?;
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(password) = changes.password {
            user.password = password;
        }
        Ok(user.clone())
    }

    async fn delete_user(&self, user_id: &str) -> UserResult<User> {
        let failed = || UserError::Internal("Failed to delete user".into());
        let id = Uuid::parse_str(user_id).map_err(|_| failed())?;
        let mut users = self.users.lock().unwrap();
        let idx = users.iter().position(|u| u.user_id == id).ok_or_else(failed)?;
        Ok(users.remove(idx))
    }

    async fn count_new_users_since(&self, since: OffsetDateTime) -> UserResult<i64> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().filter(|u| u.created_at >= since).count() as i64)
    }

    async fn change_password(&self, password: &str, user_id: &str) -> UserResult<User> {
        let failed = || UserError::Internal("Error changing password".into());
        let id = Uuid::parse_str(user_id).map_err(|_| failed())?;
        let mut users = self.users.lock().unwrap();
        let user = users.iter_mut().find(|u| u.user_id == id).ok_or_else(failed)?;
        user.password = password.to_string();
        Ok(user.clone())
    }
}
