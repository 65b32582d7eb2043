//! # User Models
//!
//! Records served by the user endpoints. [`User`] converts to and from the
//! cache's value model so whole responses can be cached.

use apicache_domain::{FromValue, RecordReader, ToValue, Value, value_enum};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access level of a user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Superuser,
    #[default]
    Member,
}

value_enum!(Role {
    Superuser => "superuser",
    Member => "member",
});

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub public_id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ToValue for User {
    fn to_value(&self) -> Value {
        Value::record()
            .field("id", &self.id)
            .field("public_id", &self.public_id)
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("is_active", &self.is_active)
            .field("role", &self.role)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .build()
    }
}

impl FromValue for User {
    fn from_value(value: Value) -> apicache_domain::Result<Self> {
        let mut r = RecordReader::new("User", value)?;
        Ok(Self {
            id: r.take("id")?,
            public_id: r.take("public_id")?,
            email: r.take("email")?,
            full_name: r.take("full_name")?,
            is_active: r.take("is_active")?,
            role: r.take("role")?,
            created_at: r.take("created_at")?,
            updated_at: r.take("updated_at")?,
        })
    }
}

/// Body of `POST /users`
#[derive(Debug, Clone, Deserialize)]
pub struct UserCreate {
    pub email: String,
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Role,
}

/// Body of `PUT /users/{user_id}`; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub is_active: Option<bool>,
    pub role: Option<Role>,
}

/// Query of `GET /users`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

const fn default_limit() -> usize {
    100
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
        }
    }
}
