use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String, // Argon2 hash, not exposed in JSON
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// User without its credential; what list and search hand out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PublicUser {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            user_id: u.user_id,
            name: u.name,
            email: u.email,
            created_at: u.created_at,
        }
    }
}

/// Values for a new row; `password` must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Partial set of column changes. `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.password.is_none()
    }
}

/// One page of a listing: 1-based page number and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    pub const DEFAULT_PAGE: u32 = 1;
    pub const DEFAULT_LIMIT: u32 = 20;

    /// Builds a page, lifting a zero page or limit to 1.
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    /// Rows to skip; saturates at `i64::MAX`, the largest OFFSET Postgres accepts.
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1).saturating_mul(i64::from(self.limit))
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PAGE, Self::DEFAULT_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            user_id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn offset_is_page_minus_one_times_limit() {
        for page in 1..=5u32 {
            for limit in [1u32, 7, 20, 100] {
                let p = Page::new(page, limit);
                assert_eq!(p.offset(), i64::from((page - 1) * limit));
                assert_eq!(p.limit(), i64::from(limit));
            }
        }
    }

    #[test]
    fn zero_page_and_limit_are_lifted_to_one() {
        let p = Page::new(0, 0);
        assert_eq!(p, Page { page: 1, limit: 1 });
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn default_page_is_first_twenty() {
        let p = Page::default();
        assert_eq!((p.page, p.limit), (1, 20));
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn offset_saturates_at_u32_bounds() {
        assert_eq!(Page::new(u32::MAX, u32::MAX).offset(), i64::MAX);
        assert_eq!(Page::new(u32::MAX, 3_000_000_000).offset(), i64::MAX);
        assert_eq!(Page::new(2, u32::MAX).offset(), i64::from(u32::MAX));
    }

    #[test]
    fn user_json_never_contains_password() {
        let user = sample_user();
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["email"], "ada@example.com");

        let public = serde_json::to_value(PublicUser::from(user)).unwrap();
        assert!(public.get("password").is_none());
        assert_eq!(public["name"], "Ada");
    }

    #[test]
    fn empty_changes_are_detected() {
        assert!(UserChanges::default().is_empty());
        let changes = UserChanges {
            name: Some("Grace".into()),
            ..Default::default()
        };
        assert!(!changes.is_empty());
    }
}
