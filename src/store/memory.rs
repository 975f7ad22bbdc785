use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AuditStore, CredentialStore, TodoStore};
use crate::audit::AuditRecord;
use crate::error::AppError;
use crate::models::{NewUser, PendingReset, Todo, TodoUpdate, User};

/// In-process store. Every mutation happens under a single write guard, which gives the
/// same single-record atomicity the Postgres adapter gets from one `UPDATE`.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    todos: RwLock<HashMap<Uuid, Todo>>,
    audit: RwLock<Vec<AuditRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far, oldest first.
    pub async fn audit_records(&self) -> Vec<AuditRecord> {
        self.audit.read().await.clone()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(AppError::DuplicateIdentity(
                "Duplicate field value entered".into(),
            ));
        }
        let user = User::new(user);
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn store_reset(&self, email: &str, reset: &PendingReset) -> Result<bool, AppError> {
        let mut users = self.users.write().await;
        match users.values_mut().find(|u| u.email == email) {
            Some(user) => {
                user.reset = Some(reset.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn complete_reset(
        &self,
        verifier: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, AppError> {
        let mut users = self.users.write().await;
        let matched = users.values_mut().find(|u| {
            u.reset
                .as_ref()
                .map_or(false, |r| r.verifier == verifier && r.is_live(now))
        });

        Ok(matched.map(|user| {
            user.password_hash = password_hash.to_string();
            user.reset = None;
            user.clone()
        }))
    }
}

#[async_trait]
impl TodoStore for MemoryStore {
    async fn list_todos(&self, user_id: Uuid) -> Result<Vec<Todo>, AppError> {
        let todos = self.todos.read().await;
        let mut owned: Vec<Todo> = todos
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn insert_todo(&self, todo: Todo) -> Result<Todo, AppError> {
        self.todos.write().await.insert(todo.id, todo.clone());
        Ok(todo)
    }

    async fn find_todo(&self, id: Uuid) -> Result<Option<Todo>, AppError> {
        Ok(self.todos.read().await.get(&id).cloned())
    }

    async fn update_todo(&self, id: Uuid, update: TodoUpdate) -> Result<Option<Todo>, AppError> {
        let mut todos = self.todos.write().await;
        Ok(todos.get_mut(&id).map(|todo| {
            todo.apply(update);
            todo.clone()
        }))
    }

    async fn delete_todo(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.todos.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append(&self, record: &AuditRecord) -> Result<(), AppError> {
        self.audit.write().await.push(record.clone());
        Ok(())
    }
}
