use std::sync::Arc;

use crate::auth::{PasswordResetService, RequestAuthenticator, TokenIssuer};
use crate::config::{Config, Environment};
use crate::store::{AuditStore, CredentialStore, TodoStore};

/// Everything the handlers need, registered once as `web::Data<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn CredentialStore>,
    pub todos: Arc<dyn TodoStore>,
    pub audit: Arc<dyn AuditStore>,
    pub tokens: TokenIssuer,
    pub authenticator: RequestAuthenticator,
    pub resets: PasswordResetService,
    pub environment: Environment,
    pub client_url: String,
    pub bcrypt_cost: u32,
}

impl AppState {
    /// Wires every store trait to the same backing store.
    pub fn new<S>(store: Arc<S>, config: &Config) -> Self
    where
        S: CredentialStore + TodoStore + AuditStore + 'static,
    {
        Self::from_parts(store.clone(), store.clone(), store, config)
    }

    pub fn from_parts(
        users: Arc<dyn CredentialStore>,
        todos: Arc<dyn TodoStore>,
        audit: Arc<dyn AuditStore>,
        config: &Config,
    ) -> Self {
        let tokens = TokenIssuer::new(&config.jwt_secret, config.jwt_ttl);

        Self {
            resets: PasswordResetService::new(
                users.clone(),
                config.reset_token_ttl,
                config.bcrypt_cost,
            ),
            authenticator: RequestAuthenticator::new(tokens.clone()),
            tokens,
            users,
            todos,
            audit,
            environment: config.environment,
            client_url: config.client_url.clone(),
            bcrypt_cost: config.bcrypt_cost,
        }
    }
}
