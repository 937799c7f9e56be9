//! Registration Use Case
//!
//! Creates a new local principal.

use std::sync::Arc;

use crate::application::config::IdentityConfig;
use crate::domain::entity::{AuditEvent, AuditEventKind, Principal};
use crate::domain::repository::{AuditSink, PrincipalRepository};
use crate::domain::value_object::{Email, RawPassword, StoredPassword, Username};
use crate::error::{IdentityError, IdentityResult};

/// Registration input
pub struct RegisterInput {
    pub email: String,
    pub username: String,
    pub password: String,
    pub phone: Option<String>,
}

/// Registration output
#[derive(Debug)]
pub struct RegisterOutput {
    pub principal_id: String,
}

/// Registration use case
pub struct RegisterUseCase<R>
where
    R: PrincipalRepository + AuditSink,
{
    repo: Arc<R>,
    config: Arc<IdentityConfig>,
}

impl<R> RegisterUseCase<R>
where
    R: PrincipalRepository + AuditSink,
{
    pub fn new(repo: Arc<R>, config: Arc<IdentityConfig>) -> Self {
        Self { repo, config }
    }

    pub async fn execute(&self, input: RegisterInput) -> IdentityResult<RegisterOutput> {
        let email = Email::new(input.email)?;
        let username = Username::new(input.username)?;
        let raw_password = RawPassword::new(input.password)?;

        if self.repo.exists_by_email(&email).await? {
            return Err(IdentityError::EmailTaken);
        }
        if self.repo.exists_by_username(&username).await? {
            return Err(IdentityError::UsernameTaken);
        }

        let password_hash = StoredPassword::from_raw(&raw_password, self.config.pepper())?;

        let mut principal = Principal::new_local(email, username, password_hash);
        principal.phone = input.phone.filter(|p| !p.trim().is_empty());

        self.repo.create(&principal).await?;

        if let Err(e) = self
            .repo
            .record(&AuditEvent::for_principal(
                AuditEventKind::PrincipalRegistered,
                principal.principal_id,
            ))
            .await
        {
            tracing::warn!(error = %e, "Failed to record audit event");
        }

        tracing::info!(
            principal_id = %principal.principal_id,
            username = %principal.username,
            "Principal registered"
        );

        Ok(RegisterOutput {
            principal_id: principal.principal_id.to_string(),
        })
    }
}
