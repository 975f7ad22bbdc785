pub mod auth;
pub mod health;
pub mod todos;

use actix_web::web;

use crate::auth::AuthMiddleware;
use crate::error::AppError;

/// Path segments that fail to parse (such as a todo id that is not a UUID) are reported as
/// malformed references.
fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _req| AppError::MalformedReference(err.to_string()).into())
}

/// Registers every route. Expects `web::Data<AppState>` to be registered on the app and
/// `FailureAuditor` to wrap it.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(path_config())
        .service(health::health)
        .service(
            web::scope("/api")
                .service(
                    web::scope("/auth")
                        .service(auth::register)
                        .service(auth::login)
                        .service(auth::forgot_password)
                        .service(auth::reset_password),
                )
                .service(
                    web::scope("/todos")
                        .wrap(AuthMiddleware)
                        .service(todos::get_todos)
                        .service(todos::create_todo)
                        .service(todos::update_todo)
                        .service(todos::delete_todo),
                ),
        );
}
