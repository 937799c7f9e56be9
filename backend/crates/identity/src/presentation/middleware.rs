//! Request Authentication
//!
//! The per-request filter: extract the bearer token, verify it, assert it
//! is an ACCESS token, load the subject from the store and attach the
//! expanded [`AuthenticatedPrincipal`] to the request — explicit context
//! in request extensions, no ambient security state.

use axum::body::Body;
use axum::http::{HeaderMap, Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::domain::repository::PrincipalRepository;
use crate::domain::service::authorization::AuthenticatedPrincipal;
use crate::domain::service::{TokenKind, TokenService};
use crate::domain::value_object::Role;
use crate::error::{IdentityError, IdentityResult};

/// Middleware state
#[derive(Clone)]
pub struct AuthMiddlewareState<R>
where
    R: PrincipalRepository + Clone + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub tokens: Arc<TokenService>,
}

/// Authenticate a request from its headers
///
/// Shared by the middleware below and by handlers that authenticate
/// in-line. Signature validity alone is not sufficient: the `type` claim
/// must be ACCESS — an MFA challenge or refresh token presented as a
/// bearer credential is rejected here.
pub async fn authenticate_bearer<R>(
    repo: &R,
    tokens: &TokenService,
    headers: &HeaderMap,
) -> IdentityResult<AuthenticatedPrincipal>
where
    R: PrincipalRepository,
{
    let token = extract_bearer(headers).ok_or(IdentityError::InvalidOrExpiredToken)?;

    let claims = tokens
        .verify(token)
        .map_err(|_| IdentityError::InvalidOrExpiredToken)?;

    if claims.kind != TokenKind::Access {
        return Err(IdentityError::InvalidOrExpiredToken);
    }

    let principal_id = claims
        .principal_id()
        .ok_or(IdentityError::InvalidOrExpiredToken)?;

    let principal = repo
        .find_by_id(&principal_id)
        .await?
        .ok_or(IdentityError::InvalidOrExpiredToken)?;

    Ok(AuthenticatedPrincipal::from_principal(&principal))
}

/// Extract the bearer token from the Authorization header
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Middleware that requires a valid access token
///
/// On success the [`AuthenticatedPrincipal`] is inserted into request
/// extensions for handlers downstream.
pub async fn require_authenticated<R>(
    state: AuthMiddlewareState<R>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response>
where
    R: PrincipalRepository + Clone + Send + Sync + 'static,
{
    let principal = authenticate_bearer(state.repo.as_ref(), &state.tokens, req.headers())
        .await
        .map_err(|e| e.into_response())?;

    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

/// Middleware that additionally requires an authority from the role chain
pub async fn require_authority<R>(
    state: AuthMiddlewareState<R>,
    required: Role,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response>
where
    R: PrincipalRepository + Clone + Send + Sync + 'static,
{
    let principal = authenticate_bearer(state.repo.as_ref(), &state.tokens, req.headers())
        .await
        .map_err(|e| e.into_response())?;

    if !principal.has_authority(required) {
        return Err((
            axum::http::StatusCode::FORBIDDEN,
            axum::Json(serde_json::json!({
                "error": "FORBIDDEN",
                "message": "Insufficient authority",
            })),
        )
            .into_response());
    }

    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}
