#![allow(dead_code)]

use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    test, web, App,
};
use serde_json::json;
use std::sync::Arc;
use tasksafe::auth::AuthResponse;
use tasksafe::store::MemoryStore;
use tasksafe::{routes, server, AppState, Config, FailureAuditor};

pub const TEST_SECRET: &str = "integration-test-secret";

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "JWT_SECRET" => Some(TEST_SECRET.to_string()),
        "BCRYPT_COST" => Some("4".to_string()),
        _ => None,
    })
    .expect("test config")
}

pub fn memory_state() -> (Arc<MemoryStore>, AppState) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(store.clone(), &test_config());
    (store, state)
}

/// Builds the app the same way `main` does, minus the access log.
pub async fn init_app(
    state: AppState,
) -> impl Service<actix_http::Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>
{
    test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(FailureAuditor::new(state.audit.clone()))
            .wrap(server::cors())
            .wrap(server::security_headers())
            .configure(routes::config),
    )
    .await
}

pub async fn register(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    name: &str,
    email: &str,
    password: &str,
) -> AuthResponse {
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "name": name, "email": email, "password": password }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), 201, "registration of {} failed", email);
    test::read_body_json(resp).await
}

/// Sends a request and returns the status together with the parsed JSON body.
pub async fn send(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    req: test::TestRequest,
) -> (actix_web::http::StatusCode, serde_json::Value) {
    let resp = test::call_service(app, req.to_request()).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|e| {
            panic!(
                "non-JSON body ({}): {:?}",
                e,
                String::from_utf8_lossy(&body)
            )
        })
    };
    (status, json)
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}
