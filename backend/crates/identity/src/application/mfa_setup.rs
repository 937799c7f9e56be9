//! MFA Setup Use Case
//!
//! Enrollment lifecycle: generate secret + recovery codes, verify the
//! first code to activate, and disable with password re-proof.
//!
//! Enrollment data is persisted *before* verification, but `mfa_enabled`
//! flips only after the first successful code check.

use std::sync::Arc;

use crate::application::config::IdentityConfig;
use crate::domain::entity::{AuditEvent, AuditEventKind};
use crate::domain::repository::{AuditSink, PrincipalRepository};
use crate::domain::value_object::{
    PrincipalId, RawPassword, RecoveryCodeHashes, TotpSecret, generate_recovery_codes,
};
use crate::error::{IdentityError, IdentityResult};
use kernel::error::app_error::AppError;

/// MFA setup output: everything the user needs to enroll, shown once
pub struct MfaSetupOutput {
    /// Base32 secret for manual entry
    pub secret: String,
    /// otpauth:// URI
    pub otpauth_url: String,
    /// Base64 PNG; absent when rendering failed (enrollment continues)
    pub qr_png_base64: Option<String>,
    /// Plaintext recovery codes; only their hashes are stored
    pub recovery_codes: Vec<String>,
}

/// Disable input: password re-proof plus one second factor
pub struct MfaDisableInput {
    pub password: String,
    /// Current TOTP code
    pub code: Option<String>,
    /// Unused recovery code
    pub recovery: Option<String>,
}

/// MFA setup use case
pub struct MfaSetupUseCase<R>
where
    R: PrincipalRepository + AuditSink,
{
    repo: Arc<R>,
    config: Arc<IdentityConfig>,
}

impl<R> MfaSetupUseCase<R>
where
    R: PrincipalRepository + AuditSink,
{
    pub fn new(repo: Arc<R>, config: Arc<IdentityConfig>) -> Self {
        Self { repo, config }
    }

    /// Start enrollment: generate and persist a fresh secret and recovery
    /// code set (replacing any previous enrollment), MFA not yet enabled
    pub async fn setup(&self, principal_id: &PrincipalId) -> IdentityResult<MfaSetupOutput> {
        let mut principal = self
            .repo
            .find_by_id(principal_id)
            .await?
            .ok_or(IdentityError::PrincipalNotFound)?;

        let secret = TotpSecret::generate();
        let recovery_codes = generate_recovery_codes();
        let recovery_hashes = RecoveryCodeHashes::from_codes(&recovery_codes)?;

        principal.enroll_mfa(secret.clone(), recovery_hashes);
        self.repo.update(&principal).await?;

        let label = principal.email.as_str();
        let otpauth_url = secret.otpauth_url(label)?;
        // Rendering may fail in headless environments; the URI and raw
        // secret remain sufficient for manual enrollment.
        let qr_png_base64 = secret.qr_png_base64(label);

        self.audit(AuditEvent::for_principal(
            AuditEventKind::MfaEnrolled,
            *principal_id,
        ))
        .await;

        tracing::info!(principal_id = %principal_id, "MFA enrollment started");

        Ok(MfaSetupOutput {
            secret: secret.as_base32().to_string(),
            otpauth_url,
            qr_png_base64,
            recovery_codes,
        })
    }

    /// Verify the first code and activate MFA
    pub async fn verify(&self, principal_id: &PrincipalId, code: &str) -> IdentityResult<()> {
        let mut principal = self
            .repo
            .find_by_id(principal_id)
            .await?
            .ok_or(IdentityError::PrincipalNotFound)?;

        if principal.mfa_enrollment.is_none() {
            return Err(IdentityError::MfaNotEnrolled);
        }

        if !principal.verify_mfa_code(code) {
            return Err(IdentityError::InvalidOtp);
        }

        principal.activate_mfa();
        self.repo.update(&principal).await?;

        self.audit(AuditEvent::for_principal(
            AuditEventKind::MfaEnabled,
            *principal_id,
        ))
        .await;

        tracing::info!(principal_id = %principal_id, "MFA enabled");

        Ok(())
    }

    /// Disable MFA
    ///
    /// Requires re-proof of the password *and* either a valid OTP or a
    /// valid unused recovery code, in the same request. Never possible
    /// from a bare access token alone.
    pub async fn disable(
        &self,
        principal_id: &PrincipalId,
        input: MfaDisableInput,
    ) -> IdentityResult<()> {
        let mut principal = self
            .repo
            .find_by_id(principal_id)
            .await?
            .ok_or(IdentityError::PrincipalNotFound)?;

        if principal.mfa_enrollment.is_none() {
            return Err(IdentityError::MfaNotEnabled);
        }

        let raw_password =
            RawPassword::new(input.password).map_err(|_| IdentityError::InvalidCredential)?;
        let password_valid = principal
            .password_hash
            .as_ref()
            .is_some_and(|hash| hash.verify(&raw_password, self.config.pepper()));
        if !password_valid {
            return Err(IdentityError::InvalidCredential);
        }

        match (
            input.code.as_deref().filter(|c| !c.trim().is_empty()),
            input.recovery.as_deref().filter(|r| !r.trim().is_empty()),
        ) {
            (Some(code), _) => {
                if !principal.verify_mfa_code(code) {
                    return Err(IdentityError::InvalidOtp);
                }
            }
            (None, Some(recovery)) => {
                if !principal.consume_recovery_code(recovery) {
                    return Err(IdentityError::InvalidRecoveryCode);
                }
            }
            (None, None) => {
                return Err(IdentityError::Validation(AppError::bad_request(
                    "Either a verification code or a recovery code is required",
                )));
            }
        }

        principal.disable_mfa();
        self.repo.update(&principal).await?;

        self.audit(AuditEvent::for_principal(
            AuditEventKind::MfaDisabled,
            *principal_id,
        ))
        .await;

        tracing::info!(principal_id = %principal_id, "MFA disabled");

        Ok(())
    }

    async fn audit(&self, event: AuditEvent) {
        if let Err(e) = self.repo.record(&event).await {
            tracing::warn!(error = %e, "Failed to record audit event");
        }
    }
}
