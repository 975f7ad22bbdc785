//! Cross-cutting HTTP middleware shared by the binary and the test suite.
//!
//! Both must sit outside `FailureAuditor` so the `{ success: false }` responses it renders
//! still carry CORS and security headers:
//!
//! ```ignore
//! App::new()
//!     .wrap(FailureAuditor::new(audit))
//!     .wrap(server::cors())
//!     .wrap(server::security_headers())
//! ```

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::middleware::DefaultHeaders;

pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allow_any_method()
        .allow_any_header()
        .max_age(3600)
}

/// Baseline hardening headers added to every response that does not set them itself.
pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .add((header::X_FRAME_OPTIONS, "DENY"))
        .add((header::REFERRER_POLICY, "no-referrer"))
        .add((header::X_XSS_PROTECTION, "0"))
}
