//! # User Repository
//!
//! Storage of users behind an async trait, with an in-memory implementation.
//! Handlers receive the repository as an injected resource, so its handle
//! type is excluded from cache keys.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Pagination, User, UserCreate, UserUpdate};

/// Repository errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("User {0} not found")]
    NotFound(i64),

    #[error("A user with email '{0}' already exists")]
    DuplicateEmail(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// User persistence
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get(&self, id: i64) -> RepositoryResult<Option<User>>;

    async fn get_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;

    async fn list(&self, page: Pagination) -> RepositoryResult<Vec<User>>;

    async fn create(&self, input: UserCreate) -> RepositoryResult<User>;

    async fn update(&self, id: i64, input: UserUpdate) -> RepositoryResult<User>;
}

/// Repository handle injected into handlers
pub type SharedUserRepository = Arc<dyn UserRepository>;

#[derive(Debug, Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, User>,
}

/// In-memory user table
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    table: RwLock<Table>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn get(&self, id: i64) -> RepositoryResult<Option<User>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let table = self.table.read().await;
        Ok(table.rows.values().find(|u| u.email == email).cloned())
    }

    async fn list(&self, page: Pagination) -> RepositoryResult<Vec<User>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .skip(page.skip)
            .take(page.limit)
            .cloned()
            .collect())
    }

    async fn create(&self, input: UserCreate) -> RepositoryResult<User> {
        let mut table = self.table.write().await;
        if table.rows.values().any(|u| u.email == input.email) {
            return Err(RepositoryError::DuplicateEmail(input.email));
        }

        table.next_id += 1;
        let now = Utc::now();
        let user = User {
            id: table.next_id,
            public_id: Uuid::now_v7(),
            email: input.email,
            full_name: input.full_name,
            is_active: true,
            role: input.role,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: i64, input: UserUpdate) -> RepositoryResult<User> {
        let mut table = self.table.write().await;

        if let Some(email) = &input.email {
            if table.rows.values().any(|u| u.id != id && &u.email == email) {
                return Err(RepositoryError::DuplicateEmail(email.clone()));
            }
        }

        let user = table.rows.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;
        if let Some(email) = input.email {
            user.email = email;
        }
        if let Some(full_name) = input.full_name {
            user.full_name = Some(full_name);
        }
        if let Some(is_active) = input.is_active {
            user.is_active = is_active;
        }
        if let Some(role) = input.role {
            user.role = role;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}
