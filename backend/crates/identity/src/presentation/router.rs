//! Identity Router

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::application::config::IdentityConfig;
use crate::domain::repository::{AuditSink, PrincipalRepository};
use crate::domain::service::AssertionVerifier;
use crate::infra::postgres::PgIdentityRepository;
use crate::presentation::handlers::{self, IdentityAppState};

/// Create the identity router with the PostgreSQL repository
pub fn identity_router(
    repo: PgIdentityRepository,
    config: IdentityConfig,
    assertion_verifier: Option<Arc<dyn AssertionVerifier>>,
) -> Router {
    identity_router_generic(repo, config, assertion_verifier)
}

/// Create a generic identity router for any store implementation
pub fn identity_router_generic<R>(
    repo: R,
    config: IdentityConfig,
    assertion_verifier: Option<Arc<dyn AssertionVerifier>>,
) -> Router
where
    R: PrincipalRepository + AuditSink + Clone + Send + Sync + 'static,
{
    let tokens = Arc::new(config.token_service());
    let state = IdentityAppState {
        repo: Arc::new(repo),
        config: Arc::new(config),
        tokens,
        assertion_verifier,
    };

    Router::new()
        .route("/register", post(handlers::register::<R>))
        .route("/login", post(handlers::login::<R>))
        .route("/federated", post(handlers::federated_login::<R>))
        .route("/refresh", post(handlers::refresh::<R>))
        .route("/me", get(handlers::me::<R>))
        .route("/password", post(handlers::change_password::<R>))
        .route("/mfa/setup", post(handlers::mfa_setup::<R>))
        .route("/mfa/verify-setup", post(handlers::mfa_verify_setup::<R>))
        .route("/mfa/verify-login", post(handlers::verify_mfa_login::<R>))
        .route("/mfa/disable", post(handlers::mfa_disable::<R>))
        .with_state(state)
}
