//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! Each variant corresponds to one entry of the failure taxonomy, described by [`ErrorKind`],
//! which owns the mapping to an HTTP status code.
//!
//! `AppError` implements `actix_web::error::ResponseError` so that a handler result is always
//! rendered as the uniform `{ "success": false, "message": ... }` body. The `Display`
//! implementation carries the diagnostic detail that ends up in audit records, while
//! [`AppError::client_message`] is the terse text shown to the client.
//!
//! `From` implementations exist for `sqlx::Error`, `validator::ValidationErrors`,
//! `jsonwebtoken::errors::Error` and `bcrypt::BcryptError`, allowing for easy conversion
//! using the `?` operator.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::ValidationErrors;

/// The stable failure taxonomy. Every error reaching the client is classified into one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Structurally invalid input (missing or malformed field).
    Validation,
    /// A uniqueness constraint was violated (e.g. email already registered).
    DuplicateIdentity,
    /// An identifier used for a lookup does not have a valid reference shape.
    MalformedReference,
    /// Missing, malformed or expired bearer token, or bad credentials.
    Unauthorized,
    /// Valid identity, but not permitted to act on the target resource.
    Forbidden,
    /// Reset-token lookup or consumption failed.
    InvalidOrExpiredToken,
    /// Referenced resource does not exist.
    NotFound,
    /// Anything unclassified.
    Internal,
}

impl ErrorKind {
    /// HTTP status code used when reporting a failure of this kind.
    ///
    /// Ownership mismatches are reported as 401, not 403.
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::Validation
            | ErrorKind::DuplicateIdentity
            | ErrorKind::InvalidOrExpiredToken => StatusCode::BAD_REQUEST,
            ErrorKind::MalformedReference | ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unauthorized | ErrorKind::Forbidden => StatusCode::UNAUTHORIZED,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// Input failed validation (HTTP 400). Carries the client-facing summary.
    Validation(String),
    /// A unique field already exists (HTTP 400).
    DuplicateIdentity(String),
    /// A lookup identifier was not a valid reference (HTTP 404). Carries diagnostic detail.
    MalformedReference(String),
    /// Authentication failed or is missing (HTTP 401).
    Unauthorized(String),
    /// The caller does not own the target resource (HTTP 401).
    Forbidden(String),
    /// The password-reset token is unknown, already used, or expired (HTTP 400).
    InvalidOrExpiredToken,
    /// The requested resource was not found (HTTP 404).
    NotFound(String),
    /// Unexpected server-side failure (HTTP 500). Carries diagnostic detail never shown to clients.
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::DuplicateIdentity(_) => ErrorKind::DuplicateIdentity,
            AppError::MalformedReference(_) => ErrorKind::MalformedReference,
            AppError::Unauthorized(_) => ErrorKind::Unauthorized,
            AppError::Forbidden(_) => ErrorKind::Forbidden,
            AppError::InvalidOrExpiredToken => ErrorKind::InvalidOrExpiredToken,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The terse message returned to the client. Never contains store or library error text.
    pub fn client_message(&self) -> String {
        match self {
            AppError::Validation(msg)
            | AppError::DuplicateIdentity(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg) => msg.clone(),
            AppError::MalformedReference(_) => "Resource not found".into(),
            AppError::InvalidOrExpiredToken => "Invalid or expired reset token".into(),
            AppError::Internal(_) => "Server Error".into(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation Error: {}", msg),
            AppError::DuplicateIdentity(msg) => write!(f, "Duplicate Identity: {}", msg),
            AppError::MalformedReference(msg) => write!(f, "Malformed Reference: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::InvalidOrExpiredToken => write!(f, "Invalid or expired reset token"),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal Server Error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// The single error body shape emitted to clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Converts `AppError` variants into `HttpResponse` objects.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.kind().status()
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody::new(self.client_message()))
    }
}

/// Converts `sqlx::Error` into `AppError`.
///
/// Unique-constraint violations are detected from the database error metadata and become
/// `DuplicateIdentity`; `RowNotFound` becomes `NotFound`; everything else is `Internal`.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match &error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::DuplicateIdentity("Duplicate field value entered".into())
            }
            _ => AppError::Internal(error.to_string()),
        }
    }
}

/// Converts `validator::ValidationErrors` into `AppError::Validation`.
///
/// Field messages are joined with `", "` in field-name order so the output is stable.
impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> AppError {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by_key(|(field, _)| *field);

        let message = fields
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("Invalid value for {}", field),
                })
            })
            .collect::<Vec<_>>()
            .join(", ");

        AppError::Validation(message)
    }
}

/// Converts `jsonwebtoken::errors::Error` into `AppError::Unauthorized`.
impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        log::debug!("Bearer token rejected: {}", error);
        AppError::Unauthorized("Not authorized to access this route".into())
    }
}

/// Converts `bcrypt::BcryptError` into `AppError::Internal`.
impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::Internal(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use validator::Validate;

    #[test]
    fn test_error_responses() {
        let error = AppError::Unauthorized("Invalid token".into());
        assert_eq!(error.error_response().status(), 401);

        let error = AppError::Forbidden("Not authorized to update this todo".into());
        assert_eq!(error.error_response().status(), 401);

        let error = AppError::Validation("Invalid input".into());
        assert_eq!(error.error_response().status(), 400);

        let error = AppError::DuplicateIdentity("Email already registered".into());
        assert_eq!(error.error_response().status(), 400);

        assert_eq!(AppError::InvalidOrExpiredToken.error_response().status(), 400);

        let error = AppError::MalformedReference("bad uuid".into());
        assert_eq!(error.error_response().status(), 404);

        let error = AppError::NotFound("Resource not found".into());
        assert_eq!(error.error_response().status(), 404);

        let error = AppError::Internal("Server error".into());
        assert_eq!(error.error_response().status(), 500);
    }

    #[actix_rt::test]
    async fn test_internal_detail_is_not_sent_to_client() {
        let error = AppError::Internal("connection refused on 10.0.0.5:5432".into());
        let body = to_bytes(error.error_response().into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Server Error");
        assert!(error.to_string().contains("10.0.0.5"));
    }

    #[derive(Validate)]
    struct Probe {
        #[validate(email(message = "Please provide a valid email"))]
        email: String,
        #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
        password: String,
    }

    #[test]
    fn test_validation_messages_are_joined_in_field_order() {
        let probe = Probe {
            email: "nope".into(),
            password: "123".into(),
        };
        let err: AppError = probe.validate().unwrap_err().into();
        match err {
            AppError::Validation(msg) => assert_eq!(
                msg,
                "Please provide a valid email, Password must be at least 6 characters"
            ),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
