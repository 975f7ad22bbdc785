//! Password recovery with single-use, time-boxed reset tokens.
//!
//! Per account the lifecycle is two states: *idle* (no pending reset) and *issued* (one
//! pending verifier with an expiry). Issuing always overwrites, so only the most recent
//! token can ever succeed. Consuming is a compare-and-clear in the store. An expired
//! verifier is ignored but never purged proactively.
//!
//! Only the SHA-256 of a raw token is stored; the raw token is returned once to the caller.

use chrono::{DateTime, Duration, Utc};
use lazy_static::lazy_static;
use rand::RngCore;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

use crate::auth::password::hash_password;
use crate::error::AppError;
use crate::models::{normalize_email, PendingReset, User};
use crate::store::CredentialStore;

const RESET_TOKEN_BYTES: usize = 20;

lazy_static! {
    // 20 random bytes, lower-case hex.
    static ref RESET_TOKEN_REGEX: Regex = Regex::new(r"^[0-9a-f]{40}$").unwrap();
}

/// A freshly generated raw reset token. Its `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct ResetTicket {
    raw_token: String,
    pub expires_at: DateTime<Utc>,
}

impl ResetTicket {
    pub fn raw_token(&self) -> &str {
        &self.raw_token
    }
}

impl fmt::Debug for ResetTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResetTicket")
            .field("raw_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Clone)]
pub struct PasswordResetService {
    store: Arc<dyn CredentialStore>,
    ttl: Duration,
    bcrypt_cost: u32,
}

impl PasswordResetService {
    pub fn new(store: Arc<dyn CredentialStore>, ttl: Duration, bcrypt_cost: u32) -> Self {
        Self {
            store,
            ttl,
            bcrypt_cost,
        }
    }

    pub async fn issue_reset_token(&self, email: &str) -> Result<ResetTicket, AppError> {
        self.issue_reset_token_at(email, Utc::now()).await
    }

    /// Issues a reset token for `email` as of `now`.
    ///
    /// The outcome looks the same whether or not the account exists: a token is generated
    /// and hashed on both paths and a single conditional write is attempted. Only an
    /// existing account is mutated.
    pub async fn issue_reset_token_at(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<ResetTicket, AppError> {
        let raw_token = generate_raw_token();
        let reset = PendingReset {
            verifier: token_verifier(&raw_token),
            expires_at: now + self.ttl,
        };

        let stored = self
            .store
            .store_reset(&normalize_email(email), &reset)
            .await?;
        if stored {
            log::info!("Password reset issued, expires at {}", reset.expires_at);
        } else {
            log::debug!("Password reset requested for an unknown account");
        }

        Ok(ResetTicket {
            raw_token,
            expires_at: reset.expires_at,
        })
    }

    pub async fn consume_reset_token(
        &self,
        raw_token: &str,
        new_password: &str,
    ) -> Result<User, AppError> {
        self.consume_reset_token_at(raw_token, new_password, Utc::now())
            .await
    }

    /// Replaces the password of the account holding a live reset for `raw_token`.
    ///
    /// Unknown, reused and expired tokens all fail with the same `InvalidOrExpiredToken`.
    pub async fn consume_reset_token_at(
        &self,
        raw_token: &str,
        new_password: &str,
        now: DateTime<Utc>,
    ) -> Result<User, AppError> {
        if !RESET_TOKEN_REGEX.is_match(raw_token) {
            return Err(AppError::InvalidOrExpiredToken);
        }

        let verifier = token_verifier(raw_token);
        let password_hash = hash_password(new_password, self.bcrypt_cost)?;

        let user = self
            .store
            .complete_reset(&verifier, &password_hash, now)
            .await?
            .ok_or(AppError::InvalidOrExpiredToken)?;

        log::info!("Password reset completed for user {}", user.id);
        Ok(user)
    }
}

fn generate_raw_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// One-way hash stored in place of the raw token.
pub fn token_verifier(raw_token: &str) -> String {
    hex::encode(Sha256::digest(raw_token.as_bytes()))
}
