//! Token Refresh Use Case
//!
//! Exchanges a valid refresh token for a fresh access token. The refresh
//! token itself is never rotated here — there is no server-side revocation
//! in this design, so its lifetime bounds the exposure window.

use std::sync::Arc;

use crate::domain::entity::{AuditEvent, AuditEventKind};
use crate::domain::repository::{AuditSink, PrincipalRepository};
use crate::domain::service::{TokenKind, TokenService};
use crate::error::{IdentityError, IdentityResult};

/// Token refresh use case
pub struct RefreshUseCase<R>
where
    R: PrincipalRepository + AuditSink,
{
    repo: Arc<R>,
    tokens: Arc<TokenService>,
}

impl<R> RefreshUseCase<R>
where
    R: PrincipalRepository + AuditSink,
{
    pub fn new(repo: Arc<R>, tokens: Arc<TokenService>) -> Self {
        Self { repo, tokens }
    }

    pub async fn execute(&self, refresh_token: &str) -> IdentityResult<String> {
        let claims = self
            .tokens
            .verify(refresh_token)
            .map_err(|_| IdentityError::InvalidOrExpiredToken)?;

        // The kind claim must be asserted: an access or MFA-challenge
        // token never refreshes anything.
        if claims.kind != TokenKind::Refresh {
            return Err(IdentityError::InvalidOrExpiredToken);
        }

        let principal_id = claims
            .principal_id()
            .ok_or(IdentityError::InvalidOrExpiredToken)?;

        let principal = self
            .repo
            .find_by_id(&principal_id)
            .await?
            .ok_or(IdentityError::InvalidOrExpiredToken)?;

        let access_token = self
            .tokens
            .issue_access_token(&principal)
            .map_err(|e| IdentityError::Internal(e.to_string()))?;

        if let Err(e) = self
            .repo
            .record(&AuditEvent::for_principal(
                AuditEventKind::TokenRefreshed,
                principal_id,
            ))
            .await
        {
            tracing::warn!(error = %e, "Failed to record audit event");
        }

        Ok(access_token)
    }
}
