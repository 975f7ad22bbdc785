use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{AuditStore, CredentialStore, TodoStore};
use crate::audit::AuditRecord;
use crate::error::AppError;
use crate::models::{NewUser, PendingReset, Todo, TodoUpdate, User};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, reset_token_hash, reset_expires_at, created_at";
const TODO_COLUMNS: &str = "id, title, description, completed, user_id, created_at, updated_at";

/// Postgres adapter for every store trait, sharing one connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the bundled migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Row shape of the `users` table. The schema's CHECK constraint keeps the two reset
/// columns null together.
#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    reset_token_hash: Option<String>,
    reset_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let reset = match (row.reset_token_hash, row.reset_expires_at) {
            (Some(verifier), Some(expires_at)) => Some(PendingReset {
                verifier,
                expires_at,
            }),
            _ => None,
        };
        User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            reset,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, AppError> {
        let user = User::new(user);
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (id, name, email, password_hash, created_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn store_reset(&self, email: &str, reset: &PendingReset) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE users SET reset_token_hash = $1, reset_expires_at = $2 WHERE email = $3",
        )
        .bind(&reset.verifier)
        .bind(reset.expires_at)
        .bind(email)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn complete_reset(
        &self,
        verifier: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, AppError> {
        // Single statement: the row lock taken by UPDATE serializes concurrent consumers,
        // and the second one re-evaluates the WHERE clause against the cleared row.
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users
             SET password_hash = $1, reset_token_hash = NULL, reset_expires_at = NULL
             WHERE reset_token_hash = $2 AND reset_expires_at > $3
             RETURNING {USER_COLUMNS}"
        ))
        .bind(password_hash)
        .bind(verifier)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }
}

#[async_trait]
impl TodoStore for PgStore {
    async fn list_todos(&self, user_id: Uuid) -> Result<Vec<Todo>, AppError> {
        let todos = sqlx::query_as::<_, Todo>(&format!(
            "SELECT {TODO_COLUMNS} FROM todos WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(todos)
    }

    async fn insert_todo(&self, todo: Todo) -> Result<Todo, AppError> {
        let todo = sqlx::query_as::<_, Todo>(&format!(
            "INSERT INTO todos (id, title, description, completed, user_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {TODO_COLUMNS}"
        ))
        .bind(todo.id)
        .bind(todo.title)
        .bind(todo.description)
        .bind(todo.completed)
        .bind(todo.user_id)
        .bind(todo.created_at)
        .bind(todo.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(todo)
    }

    async fn find_todo(&self, id: Uuid) -> Result<Option<Todo>, AppError> {
        let todo = sqlx::query_as::<_, Todo>(&format!(
            "SELECT {TODO_COLUMNS} FROM todos WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(todo)
    }

    async fn update_todo(&self, id: Uuid, update: TodoUpdate) -> Result<Option<Todo>, AppError> {
        let todo = sqlx::query_as::<_, Todo>(&format!(
            "UPDATE todos
             SET title = COALESCE($1, title),
                 description = COALESCE($2, description),
                 completed = COALESCE($3, completed),
                 updated_at = NOW()
             WHERE id = $4
             RETURNING {TODO_COLUMNS}"
        ))
        .bind(update.title)
        .bind(update.description)
        .bind(update.completed)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(todo)
    }

    async fn delete_todo(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM todos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AuditStore for PgStore {
    async fn append(&self, record: &AuditRecord) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO audit_logs (id, level, message, stack, user_id, endpoint, method, timestamp)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(record.id)
        .bind(record.level)
        .bind(&record.message)
        .bind(&record.stack)
        .bind(record.user_id)
        .bind(&record.endpoint)
        .bind(&record.method)
        .bind(record.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
