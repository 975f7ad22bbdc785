use actix_web::{
    body::{EitherBody, MessageBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::InternalError,
    Error, HttpMessage, HttpRequest, HttpResponse,
};
use chrono::Utc;
use futures::future::{ready, LocalBoxFuture, Ready};
use std::sync::Arc;
use uuid::Uuid;

use super::{classify, redact_path, AuditLevel, AuditRecord};
use crate::auth::AuthenticatedUser;
use crate::store::AuditStore;

/// Terminal stage for every failure raised while handling a request.
///
/// Register it on the `App` after every middleware whose failures should be audited, so
/// that errors from routing, extractors, the auth gate and handlers all pass through it.
/// Each failure yields exactly one audit record and one
/// `{ "success": false, "message": ... }` response. Failures returned as `Err` by inner
/// middleware stay `Err`, carrying that same response.
pub struct FailureAuditor {
    store: Arc<dyn AuditStore>,
}

impl FailureAuditor {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }
}

impl<S, B> Transform<S, ServiceRequest> for FailureAuditor
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = FailureAuditorService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(FailureAuditorService {
            service,
            store: self.store.clone(),
        }))
    }
}

pub struct FailureAuditorService<S> {
    service: S,
    store: Arc<dyn AuditStore>,
}

impl<S, B> Service<ServiceRequest> for FailureAuditorService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Owned copies only: the router needs sole ownership of the request while matching.
        let target = RequestTarget::from_request(req.request());
        let store = self.store.clone();
        let fut = self.service.call(req);

        Box::pin(async move {
            match fut.await {
                Ok(res) => {
                    let replacement = match res.response().error() {
                        Some(err) => {
                            let user_id = resolved_user(res.request());
                            Some(handle_failure(store.as_ref(), err, &target, user_id).await)
                        }
                        None => None,
                    };
                    match replacement {
                        Some(response) => Ok(res.into_response(response).map_into_right_body()),
                        None => Ok(res.map_into_left_body()),
                    }
                }
                Err(err) => {
                    let response = handle_failure(store.as_ref(), &err, &target, None).await;
                    Err(InternalError::from_response(err, response).into())
                }
            }
        })
    }
}

/// Method and redacted path plus query of a request, captured before it is handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    pub method: String,
    pub endpoint: String,
}

impl RequestTarget {
    pub fn from_request(req: &HttpRequest) -> Self {
        let path_and_query = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| req.path());

        Self {
            method: req.method().to_string(),
            endpoint: redact_path(path_and_query).into_owned(),
        }
    }
}

fn resolved_user(req: &HttpRequest) -> Option<Uuid> {
    req.extensions().get::<AuthenticatedUser>().map(|user| user.id())
}

/// Persists the audit record (best effort) and renders the client response.
pub async fn handle_failure(
    store: &dyn AuditStore,
    err: &Error,
    target: &RequestTarget,
    user_id: Option<Uuid>,
) -> HttpResponse {
    let failure = classify(err);
    let record = AuditRecord {
        id: Uuid::new_v4(),
        level: failure.level(),
        message: err.to_string(),
        stack: Some(format!("{:?}", err)),
        user_id,
        endpoint: target.endpoint.clone(),
        method: target.method.clone(),
        timestamp: Utc::now(),
    };

    match record.level {
        AuditLevel::Error => log::error!(
            "{} {} failed: {}",
            record.method,
            record.endpoint,
            record.message
        ),
        _ => log::warn!(
            "{} {} rejected with {}: {}",
            record.method,
            record.endpoint,
            failure.status().as_u16(),
            record.message
        ),
    }

    if let Err(audit_err) = store.append(&record).await {
        log::error!("Failed to persist audit record {}: {}", record.id, audit_err);
    }

    failure.into_response()
}
