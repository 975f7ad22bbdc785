mod common;

use actix_web::{http::StatusCode, test};
use async_trait::async_trait;
use common::{bearer, init_app, memory_state, register, send, test_config};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use tasksafe::audit::{AuditLevel, AuditRecord};
use tasksafe::error::AppError;
use tasksafe::store::{AuditStore, MemoryStore};
use tasksafe::AppState;

/// An audit sink that is always down.
struct FailingAuditStore;

#[async_trait]
impl AuditStore for FailingAuditStore {
    async fn append(&self, _record: &AuditRecord) -> Result<(), AppError> {
        Err(AppError::Internal("audit table unavailable".into()))
    }
}

#[test_log::test(actix_rt::test)]
async fn test_each_failure_is_recorded_exactly_once() {
    let (store, state) = memory_state();
    let app = init_app(state).await;

    let (status, _) = send(&app, test::TestRequest::get().uri("/api/todos")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let records = store.audit_records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].level, AuditLevel::Warn);
    assert_eq!(records[0].endpoint, "/api/todos");
    assert_eq!(records[0].method, "GET");
    assert!(records[0].user_id.is_none());

    let (status, _) = send(
        &app,
        test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "nobody@x.com", "password": "whatever" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(store.audit_records().await.len(), 2);
}

#[actix_rt::test]
async fn test_successful_requests_leave_no_record() {
    let (store, state) = memory_state();
    let app = init_app(state).await;

    let auth = register(&app, "Ada", "ada@x.com", "secret1").await;
    let (status, _) = send(
        &app,
        test::TestRequest::get()
            .uri("/api/todos")
            .append_header(bearer(&auth.token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, test::TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);

    assert!(store.audit_records().await.is_empty());
}

#[actix_rt::test]
async fn test_authenticated_failure_records_the_user() {
    let (store, state) = memory_state();
    let app = init_app(state).await;
    let auth = register(&app, "Ada", "ada@x.com", "secret1").await;

    let (status, _) = send(
        &app,
        test::TestRequest::post()
            .uri("/api/todos")
            .append_header(bearer(&auth.token))
            .set_json(json!({ "title": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let records = store.audit_records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].user_id, Some(auth.user.id));
    assert_eq!(records[0].method, "POST");
}

#[actix_rt::test]
async fn test_reset_token_is_redacted_from_the_record() {
    let (store, state) = memory_state();
    let app = init_app(state).await;
    let token = "ab".repeat(20);

    let (status, _) = send(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/auth/resetpassword/{}", token))
            .set_json(json!({ "password": "newpass1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let records = store.audit_records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].endpoint, "/api/auth/resetpassword/:resettoken");
    assert!(!records[0].message.contains(&token));
    assert!(!records[0].stack.as_deref().unwrap_or("").contains(&token));
}

#[actix_rt::test]
async fn test_malformed_reference_is_recorded_as_a_warning() {
    let (store, state) = memory_state();
    let app = init_app(state).await;
    let auth = register(&app, "Ada", "ada@x.com", "secret1").await;

    let (status, body) = send(
        &app,
        test::TestRequest::delete()
            .uri("/api/todos/42")
            .append_header(bearer(&auth.token)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Resource not found");

    let records = store.audit_records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].level, AuditLevel::Warn);
    assert!(
        records[0].message.starts_with("Malformed Reference"),
        "unexpected message: {}",
        records[0].message
    );
}

#[actix_rt::test]
async fn test_query_string_is_kept_in_the_record() {
    let (store, state) = memory_state();
    let app = init_app(state).await;

    let (status, _) = send(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/auth/resetpassword/{}?from=email", "ab".repeat(20)))
            .set_json(json!({ "password": "newpass1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let records = store.audit_records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].endpoint,
        "/api/auth/resetpassword/:resettoken?from=email"
    );
}

#[actix_rt::test]
async fn test_audit_store_failure_does_not_change_the_response() {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::from_parts(
        store.clone(),
        store.clone(),
        Arc::new(FailingAuditStore),
        &test_config(),
    );
    let app = init_app(state).await;

    let (status, body) = send(&app, test::TestRequest::get().uri("/api/todos")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Not authorized, no token");

    let (status, body) = send(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/auth/resetpassword/{}", "0".repeat(40)))
            .set_json(json!({ "password": "newpass1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "success": false, "message": "Invalid or expired reset token" })
    );
}
