use actix_web::{
    body::{EitherBody, MessageBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, AUTHORIZATION},
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::{AuthenticatedUser, TokenIssuer};
use crate::error::AppError;
use crate::state::AppState;

/// Resolves the caller's identity from the `Authorization: Bearer <token>` header.
///
/// Pure signature and expiry check: the credential store is never consulted.
#[derive(Clone)]
pub struct RequestAuthenticator {
    tokens: TokenIssuer,
}

impl RequestAuthenticator {
    pub fn new(tokens: TokenIssuer) -> Self {
        Self { tokens }
    }

    pub fn authenticate(&self, headers: &HeaderMap) -> Result<AuthenticatedUser, AppError> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Not authorized, no token".into()))?;

        let claims = self.tokens.verify(token)?;
        Ok(AuthenticatedUser(claims.sub))
    }
}

/// Gate for protected scopes: answers with an `Unauthorized` error response unless the
/// request carries a valid bearer token, and records the resolved [`AuthenticatedUser`] on
/// the request.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
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
        let outcome = match req.app_data::<web::Data<AppState>>() {
            Some(state) => state.authenticator.authenticate(req.headers()),
            None => Err(AppError::Internal(
                "AppState is not registered; AuthMiddleware cannot verify tokens".into(),
            )),
        };

        match outcome {
            Ok(user) => {
                req.extensions_mut().insert(user);
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            Err(app_err) => {
                let res = req.error_response(app_err).map_into_right_body();
                Box::pin(async move { Ok(res) })
            }
        }
    }
}
