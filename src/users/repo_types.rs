use anyhow::Context;
use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::{jwt::JwtKeys, password};

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub password_hash: String, // Argon2 PHC string
    pub avatar: String,
    pub cover_image: Option<String>,
    pub refresh_token: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Fields supplied when inserting a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub avatar: String,
    pub cover_image: Option<String>,
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            full_name: u.full_name,
            email: u.email,
            username: u.username,
            avatar: u.avatar,
            cover_image: u.cover_image,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

impl User {
    /// `Ok(false)` for a wrong password; an error means this user's stored
    /// hash is damaged.
    pub fn is_password_correct(&self, attempt: &str) -> anyhow::Result<bool> {
        password::verify_password(attempt, &self.password_hash)
            .with_context(|| format!("checking password for user {}", self.id))
    }

    /// Short-lived token carrying the user's profile claims.
    pub fn generate_access_token(&self, keys: &JwtKeys) -> anyhow::Result<String> {
        keys.sign_access(self)
    }

    pub fn generate_refresh_token(&self, keys: &JwtKeys) -> anyhow::Result<String> {
        keys.sign_refresh(self.id)
    }
}
