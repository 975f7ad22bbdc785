use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A pending password reset: the one-way hash of the raw token plus its absolute expiry.
///
/// Both halves always travel together, so a user can never hold a verifier without an
/// expiry or the other way around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReset {
    pub verifier: String,
    pub expires_at: DateTime<Utc>,
}

impl PendingReset {
    /// A reset past its expiry is treated as absent even while it is still stored.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// A registered account as held by the credential store.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    /// Lower-cased, trimmed; the case-insensitive compare key.
    pub email: String,
    /// bcrypt hash with the salt embedded.
    pub password_hash: String,
    pub reset: Option<PendingReset>,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create a [`User`].
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl User {
    pub fn new(input: NewUser) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            email: input.email,
            password_hash: input.password_hash,
            reset: None,
            created_at: Utc::now(),
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// The public view of a user returned by the auth endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Canonical form of an email address used for storage and lookups.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
