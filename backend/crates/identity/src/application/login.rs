//! Login Use Case
//!
//! The login state machine. Password and federated paths both converge on
//! [`LoginUseCase::conclude`], the single token-issuance decision point:
//! MFA enforcement cannot be bypassed by choosing an entry path.

use std::sync::Arc;

use platform::client::ClientInfo;

use crate::application::config::IdentityConfig;
use crate::domain::entity::{AuditEvent, AuditEventKind, Principal};
use crate::domain::repository::{AuditSink, PrincipalRepository};
use crate::domain::service::{FederatedIdentity, TokenService};
use crate::domain::value_object::{Email, RawPassword, StoredPassword, Username};
use crate::error::{IdentityError, IdentityResult};

/// Login input (password path)
pub struct LoginInput {
    /// Email or username
    pub identifier: String,
    /// Password
    pub password: String,
}

/// Outcome of the first login step
#[derive(Debug)]
pub enum LoginOutcome {
    /// MFA is off for this principal: the final access token, issued now
    Authenticated { access_token: String },
    /// MFA is on: a short-lived challenge token, and nothing else
    ChallengeRequired {
        mfa_token: String,
        expires_in_seconds: u64,
    },
}

/// Login use case
pub struct LoginUseCase<R>
where
    R: PrincipalRepository + AuditSink,
{
    repo: Arc<R>,
    tokens: Arc<TokenService>,
    config: Arc<IdentityConfig>,
}

impl<R> LoginUseCase<R>
where
    R: PrincipalRepository + AuditSink,
{
    pub fn new(repo: Arc<R>, tokens: Arc<TokenService>, config: Arc<IdentityConfig>) -> Self {
        Self {
            repo,
            tokens,
            config,
        }
    }

    /// Password path, step one
    ///
    /// Any failure before the decision point is the generic
    /// `InvalidCredential`: the response must not reveal whether the
    /// identifier existed.
    pub async fn execute(
        &self,
        input: LoginInput,
        client: &ClientInfo,
    ) -> IdentityResult<LoginOutcome> {
        let principal = self.resolve_identifier(&input.identifier).await?;

        let Some(principal) = principal else {
            self.audit(
                AuditEvent::new(AuditEventKind::LoginFailed)
                    .with_identifier(&input.identifier)
                    .with_ip(client.ip_string()),
            )
            .await;
            return Err(IdentityError::InvalidCredential);
        };

        let raw_password =
            RawPassword::new(input.password).map_err(|_| IdentityError::InvalidCredential)?;

        let password_valid = principal
            .password_hash
            .as_ref()
            .is_some_and(|hash| hash.verify(&raw_password, self.config.pepper()));

        if !password_valid {
            self.audit(
                AuditEvent::for_principal(AuditEventKind::LoginFailed, principal.principal_id)
                    .with_ip(client.ip_string()),
            )
            .await;
            return Err(IdentityError::InvalidCredential);
        }

        self.conclude(principal, client).await
    }

    /// Federated path
    ///
    /// Begins at "trusted email received": the assertion has already been
    /// verified by the collaborator. Finds or provisions the principal and
    /// re-enters the same decision point as the password path.
    pub async fn execute_federated(
        &self,
        identity: FederatedIdentity,
        client: &ClientInfo,
    ) -> IdentityResult<LoginOutcome> {
        let email = Email::new(&identity.email).map_err(|_| IdentityError::InvalidCredential)?;

        let principal = match self.repo.find_by_email(&email).await? {
            Some(mut existing) => {
                existing.link_federated_subject(identity.subject);
                existing
            }
            None => self.provision_federated(email, identity.subject, client).await?,
        };

        self.conclude(principal, client).await
    }

    /// The single token-issuance decision point
    async fn conclude(
        &self,
        mut principal: Principal,
        client: &ClientInfo,
    ) -> IdentityResult<LoginOutcome> {
        if principal.requires_mfa() {
            // No access or refresh token leaves this branch: a stolen
            // password alone never grants access to an MFA-protected
            // account.
            let mfa_token = self
                .tokens
                .issue_mfa_challenge(principal.principal_id)
                .map_err(|e| IdentityError::Internal(e.to_string()))?;

            self.repo.update(&principal).await?;

            self.audit(
                AuditEvent::for_principal(
                    AuditEventKind::MfaChallengeIssued,
                    principal.principal_id,
                )
                .with_ip(client.ip_string()),
            )
            .await;

            tracing::info!(principal_id = %principal.principal_id, "MFA challenge issued");

            return Ok(LoginOutcome::ChallengeRequired {
                mfa_token,
                expires_in_seconds: self.tokens.mfa_ttl_seconds(),
            });
        }

        principal.record_login();
        self.repo.update(&principal).await?;

        let access_token = self
            .tokens
            .issue_access_token(&principal)
            .map_err(|e| IdentityError::Internal(e.to_string()))?;

        self.audit(
            AuditEvent::for_principal(AuditEventKind::LoginSucceeded, principal.principal_id)
                .with_ip(client.ip_string()),
        )
        .await;

        tracing::info!(principal_id = %principal.principal_id, "Login succeeded");

        Ok(LoginOutcome::Authenticated { access_token })
    }

    /// Resolve an identifier to a principal: email when it looks like one,
    /// username otherwise
    async fn resolve_identifier(&self, identifier: &str) -> IdentityResult<Option<Principal>> {
        if identifier.contains('@') {
            let email = Email::new(identifier).map_err(|_| IdentityError::InvalidCredential)?;
            self.repo.find_by_email(&email).await
        } else {
            let username =
                Username::new(identifier).map_err(|_| IdentityError::InvalidCredential)?;
            self.repo.find_by_username(&username).await
        }
    }

    /// First federated login of an unknown email: create the principal
    ///
    /// The new account gets a random, never-communicated password hash and
    /// the default role.
    async fn provision_federated(
        &self,
        email: Email,
        subject: String,
        client: &ClientInfo,
    ) -> IdentityResult<Principal> {
        let username = self.pick_free_username(&email).await?;

        let unusable = RawPassword::generate_unusable();
        let password_hash = StoredPassword::from_raw(&unusable, self.config.pepper())?;

        let principal = Principal::new_federated(email, username, subject, password_hash);
        self.repo.create(&principal).await?;

        self.audit(
            AuditEvent::for_principal(
                AuditEventKind::FederatedPrincipalProvisioned,
                principal.principal_id,
            )
            .with_ip(client.ip_string()),
        )
        .await;

        tracing::info!(principal_id = %principal.principal_id, "Federated principal provisioned");

        Ok(principal)
    }

    /// Derive a unique username from the email's local part
    async fn pick_free_username(&self, email: &Email) -> IdentityResult<Username> {
        let base = Username::from_email_local_part(email.as_str());
        if !self.repo.exists_by_username(&base).await? {
            return Ok(base);
        }

        for n in 1..=100u32 {
            let candidate = base.with_suffix(n);
            if !self.repo.exists_by_username(&candidate).await? {
                return Ok(candidate);
            }
        }

        Err(IdentityError::Internal(
            "Could not derive a free username".to_string(),
        ))
    }

    async fn audit(&self, event: AuditEvent) {
        if let Err(e) = self.repo.record(&event).await {
            tracing::warn!(error = %e, "Failed to record audit event");
        }
    }
}
