//! Failure auditing: the append-only [`AuditRecord`] and the [`FailureAuditor`] middleware
//! that writes one record per failed request before answering the client.

pub mod classify;
pub mod middleware;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use uuid::Uuid;

pub use classify::{classify, Failure};
pub use middleware::FailureAuditor;

const RESET_ROUTE_PREFIX: &str = "/auth/resetpassword/";

/// Severity stored with an audit record.
/// Corresponds to the `audit_level` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "audit_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AuditLevel {
    Error,
    Warn,
    Info,
}

/// One observed request failure. Created by the auditor, never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub level: AuditLevel,
    pub message: String,
    pub stack: Option<String>,
    pub user_id: Option<Uuid>,
    pub endpoint: String,
    pub method: String,
    pub timestamp: DateTime<Utc>,
}

/// Replaces the raw reset token in a request path so it never reaches logs or the audit store.
pub fn redact_path(path: &str) -> Cow<'_, str> {
    match path.find(RESET_ROUTE_PREFIX) {
        Some(idx) => {
            let keep = idx + RESET_ROUTE_PREFIX.len();
            let rest = &path[keep..];
            let tail = rest.find(&['/', '?'][..]).map(|i| &rest[i..]).unwrap_or("");
            Cow::Owned(format!("{}:resettoken{}", &path[..keep], tail))
        }
        None => Cow::Borrowed(path),
    }
}
