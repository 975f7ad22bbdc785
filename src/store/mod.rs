//! Storage ports and their adapters.
//!
//! The handlers and services only ever see the traits below. [`PgStore`] backs them with
//! Postgres through `sqlx`; [`MemoryStore`] keeps everything in process and is used by the
//! test suite and by development runs without a `DATABASE_URL`.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::audit::AuditRecord;
use crate::error::AppError;
use crate::models::{NewUser, PendingReset, Todo, TodoUpdate, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Durable user records, including the pending password-reset verifier.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Inserts a new user. Fails with `DuplicateIdentity` when the email is taken.
    async fn insert_user(&self, user: NewUser) -> Result<User, AppError>;

    /// Looks a user up by normalized email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Overwrites the pending reset of the account with this email in a single write.
    ///
    /// Returns `false`, without mutating anything, when no account matches.
    async fn store_reset(&self, email: &str, reset: &PendingReset) -> Result<bool, AppError>;

    /// Atomic compare-and-clear: if a user holds `verifier` with an expiry after `now`,
    /// replace its password hash and clear the pending reset in one step.
    ///
    /// Returns `None` when no live reset matches; of two concurrent callers presenting the
    /// same verifier at most one gets `Some`.
    async fn complete_reset(
        &self,
        verifier: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, AppError>;
}

/// Owner-scoped todo persistence.
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// All todos of `user_id`, newest first.
    async fn list_todos(&self, user_id: Uuid) -> Result<Vec<Todo>, AppError>;

    async fn insert_todo(&self, todo: Todo) -> Result<Todo, AppError>;

    async fn find_todo(&self, id: Uuid) -> Result<Option<Todo>, AppError>;

    /// Applies the update and returns the new state, or `None` if the todo vanished.
    async fn update_todo(&self, id: Uuid, update: TodoUpdate) -> Result<Option<Todo>, AppError>;

    /// Returns `true` if a row was removed.
    async fn delete_todo(&self, id: Uuid) -> Result<bool, AppError>;
}

/// Append-only sink for audit records.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, record: &AuditRecord) -> Result<(), AppError>;
}
