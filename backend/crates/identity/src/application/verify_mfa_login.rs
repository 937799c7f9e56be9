//! MFA Login Verification Use Case
//!
//! Second step of the login protocol: exchange a valid challenge token and
//! a correct TOTP code for the final access/refresh token pair.

use std::sync::Arc;

use platform::client::ClientInfo;

use crate::domain::entity::{AuditEvent, AuditEventKind};
use crate::domain::repository::{AuditSink, PrincipalRepository};
use crate::domain::service::TokenService;
use crate::error::{IdentityError, IdentityResult};

/// Verify input
pub struct VerifyMfaLoginInput {
    /// Challenge token from step one
    pub mfa_token: String,
    /// 6-digit TOTP code
    pub code: String,
}

/// Final token pair
#[derive(Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// MFA login verification use case
pub struct VerifyMfaLoginUseCase<R>
where
    R: PrincipalRepository + AuditSink,
{
    repo: Arc<R>,
    tokens: Arc<TokenService>,
}

impl<R> VerifyMfaLoginUseCase<R>
where
    R: PrincipalRepository + AuditSink,
{
    pub fn new(repo: Arc<R>, tokens: Arc<TokenService>) -> Self {
        Self { repo, tokens }
    }

    pub async fn execute(
        &self,
        input: VerifyMfaLoginInput,
        client: &ClientInfo,
    ) -> IdentityResult<TokenPair> {
        // An invalid or expired challenge is indistinguishable from a
        // crafted one: 401, no detail.
        let principal_id = self
            .tokens
            .resolve_mfa_challenge(&input.mfa_token)
            .ok_or(IdentityError::InvalidOrExpiredToken)?;

        let mut principal = self
            .repo
            .find_by_id(&principal_id)
            .await?
            .ok_or(IdentityError::InvalidOrExpiredToken)?;

        if !principal.requires_mfa() {
            return Err(IdentityError::MfaNotEnabled);
        }

        if !principal.verify_mfa_code(&input.code) {
            self.audit(
                AuditEvent::for_principal(AuditEventKind::MfaLoginFailed, principal_id)
                    .with_ip(client.ip_string()),
            )
            .await;
            return Err(IdentityError::InvalidOtp);
        }

        principal.record_login();
        self.repo.update(&principal).await?;

        let access_token = self
            .tokens
            .issue_access_token(&principal)
            .map_err(|e| IdentityError::Internal(e.to_string()))?;
        let refresh_token = self
            .tokens
            .issue_refresh_token(&principal)
            .map_err(|e| IdentityError::Internal(e.to_string()))?;

        self.audit(
            AuditEvent::for_principal(AuditEventKind::MfaLoginSucceeded, principal_id)
                .with_ip(client.ip_string()),
        )
        .await;

        tracing::info!(principal_id = %principal_id, "MFA login completed");

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    async fn audit(&self, event: AuditEvent) {
        if let Err(e) = self.repo.record(&event).await {
            tracing::warn!(error = %e, "Failed to record audit event");
        }
    }
}
