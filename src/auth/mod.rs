pub mod extractors;
pub mod middleware;
pub mod password;
pub mod reset;
pub mod token;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::UserProfile;

// Re-export necessary items
pub use extractors::AuthenticatedUser;
pub use middleware::{AuthMiddleware, RequestAuthenticator};
pub use password::{hash_password, verify_password};
pub use reset::{PasswordResetService, ResetTicket};
pub use token::{Claims, TokenIssuer};

/// Represents the payload for a user login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Please provide a password"))]
    pub password: String,
}

/// Represents the payload for a new user registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name, 2 to 50 characters.
    #[validate(length(min = 2, max = 50, message = "Name must be between 2 and 50 characters"))]
    pub name: String,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    /// Must be at least 6 characters long.
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Response structure after successful authentication (register, login, password reset).
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    /// The bearer token for subsequent requests.
    pub token: String,
    pub user: UserProfile,
}

/// Response to a forgot-password request. Identical whether or not the account exists.
///
/// `reset_token` and `reset_url` are only filled outside production, for local testing.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_url: Option<String>,
}
