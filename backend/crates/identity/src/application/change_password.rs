//! Password Change Use Case
//!
//! Replaces the password hash after re-proof of the current password.

use std::sync::Arc;

use crate::application::config::IdentityConfig;
use crate::domain::entity::{AuditEvent, AuditEventKind};
use crate::domain::repository::{AuditSink, PrincipalRepository};
use crate::domain::value_object::{PrincipalId, RawPassword, StoredPassword};
use crate::error::{IdentityError, IdentityResult};

/// Password change use case
pub struct ChangePasswordUseCase<R>
where
    R: PrincipalRepository + AuditSink,
{
    repo: Arc<R>,
    config: Arc<IdentityConfig>,
}

impl<R> ChangePasswordUseCase<R>
where
    R: PrincipalRepository + AuditSink,
{
    pub fn new(repo: Arc<R>, config: Arc<IdentityConfig>) -> Self {
        Self { repo, config }
    }

    pub async fn execute(
        &self,
        principal_id: &PrincipalId,
        current_password: String,
        new_password: String,
    ) -> IdentityResult<()> {
        let mut principal = self
            .repo
            .find_by_id(principal_id)
            .await?
            .ok_or(IdentityError::PrincipalNotFound)?;

        let current =
            RawPassword::new(current_password).map_err(|_| IdentityError::InvalidCredential)?;
        let current_valid = principal
            .password_hash
            .as_ref()
            .is_some_and(|hash| hash.verify(&current, self.config.pepper()));
        if !current_valid {
            return Err(IdentityError::InvalidCredential);
        }

        // The new password goes through full policy validation
        let new_raw = RawPassword::new(new_password)?;
        let new_hash = StoredPassword::from_raw(&new_raw, self.config.pepper())?;

        principal.set_password(new_hash);
        self.repo.update(&principal).await?;

        if let Err(e) = self
            .repo
            .record(&AuditEvent::for_principal(
                AuditEventKind::PasswordChanged,
                *principal_id,
            ))
            .await
        {
            tracing::warn!(error = %e, "Failed to record audit event");
        }

        tracing::info!(principal_id = %principal_id, "Password changed");

        Ok(())
    }
}
