//! Database models for users.

use crate::api::models::users::{Role, UserCreate, UserUpdate};
use crate::types::UserId;
use chrono::{DateTime, Utc};

/// Database request for creating a new user
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub email: String,
    pub password_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: bool,
}

impl UserCreateDBRequest {
    /// Build from an API request whose password has already been hashed.
    pub fn new(api: UserCreate, password_hash: String) -> Self {
        Self {
            email: api.email,
            password_hash: Some(password_hash),
            first_name: api.first_name,
            last_name: api.last_name,
            role: api.role.unwrap_or(Role::User),
            phone: api.phone,
            avatar_url: api.avatar_url,
            is_active: api.is_active.unwrap_or(true),
        }
    }
}

/// Database request for updating a user
#[derive(Debug, Clone, Default)]
pub struct UserUpdateDBRequest {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<Option<String>>,
    pub avatar_url: Option<Option<String>>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl UserUpdateDBRequest {
    /// Passwords are hashed by the caller, never taken from the API model.
    pub fn new(update: UserUpdate, password_hash: Option<String>) -> Self {
        Self {
            email: update.email,
            password_hash,
            first_name: update.first_name,
            last_name: update.last_name,
            phone: update.phone,
            avatar_url: update.avatar_url,
            role: update.role,
            is_active: update.is_active,
        }
    }
}

/// Database response for a user
#[derive(Debug, Clone)]
pub struct UserDBResponse {
    pub id: UserId,
    pub email: String,
    pub password_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
