use actix_web::{
    error::{InternalError, JsonPayloadError, PathError, QueryPayloadError},
    http::StatusCode,
    HttpResponse,
};

use super::AuditLevel;
use crate::error::{AppError, ErrorBody, ErrorKind};

/// A failure mapped onto the taxonomy, ready to be rendered for the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl Failure {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    pub fn level(&self) -> AuditLevel {
        match self.kind {
            ErrorKind::Internal => AuditLevel::Error,
            _ => AuditLevel::Warn,
        }
    }

    pub fn into_response(self) -> HttpResponse {
        HttpResponse::build(self.status()).json(ErrorBody::new(self.message))
    }
}

/// Classifies any error surfaced while handling a request.
///
/// Works on the concrete error type behind `actix_web::Error`, never on message text.
/// Order: application errors, then path/body/query extractor failures, then the status code
/// the error would render with; everything else is `Internal`.
pub fn classify(err: &actix_web::Error) -> Failure {
    if let Some(app_err) = err.as_error::<AppError>() {
        return Failure::new(app_err.kind(), app_err.client_message());
    }

    // `web::Path` without a custom error handler wraps its failure as `ErrorNotFound`.
    if err.as_error::<InternalError<PathError>>().is_some() {
        return Failure::new(ErrorKind::MalformedReference, "Resource not found");
    }

    if let Some(payload_err) = err.as_error::<JsonPayloadError>() {
        let message = match payload_err {
            JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
                "Request body too large"
            }
            JsonPayloadError::ContentType => "Request body must be JSON",
            _ => "Invalid request body",
        };
        return Failure::new(ErrorKind::Validation, message);
    }

    if err.as_error::<QueryPayloadError>().is_some() {
        return Failure::new(ErrorKind::Validation, "Invalid query string");
    }

    match err.as_response_error().status_code() {
        StatusCode::UNAUTHORIZED => {
            Failure::new(ErrorKind::Unauthorized, "Not authorized to access this route")
        }
        StatusCode::NOT_FOUND => Failure::new(ErrorKind::NotFound, "Resource not found"),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            Failure::new(ErrorKind::Validation, "Invalid request")
        }
        _ => Failure::new(ErrorKind::Internal, "Server Error"),
    }
}
