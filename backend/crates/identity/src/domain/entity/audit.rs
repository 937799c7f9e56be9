//! Security Audit Event
//!
//! One record per security-relevant state transition, handed to the
//! collaborator audit sink. Recording must never fail the request that
//! produced the event.

use chrono::{DateTime, Utc};

use crate::domain::value_object::PrincipalId;

/// Classification of auditable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEventKind {
    LoginSucceeded,
    LoginFailed,
    MfaChallengeIssued,
    MfaLoginSucceeded,
    MfaLoginFailed,
    MfaEnrolled,
    MfaEnabled,
    MfaDisabled,
    PrincipalRegistered,
    FederatedPrincipalProvisioned,
    PasswordChanged,
    TokenRefreshed,
}

impl AuditEventKind {
    /// Stable storage code
    pub const fn code(&self) -> &'static str {
        use AuditEventKind::*;
        match self {
            LoginSucceeded => "LOGIN_SUCCEEDED",
            LoginFailed => "LOGIN_FAILED",
            MfaChallengeIssued => "MFA_CHALLENGE_ISSUED",
            MfaLoginSucceeded => "MFA_LOGIN_SUCCEEDED",
            MfaLoginFailed => "MFA_LOGIN_FAILED",
            MfaEnrolled => "MFA_ENROLLED",
            MfaEnabled => "MFA_ENABLED",
            MfaDisabled => "MFA_DISABLED",
            PrincipalRegistered => "PRINCIPAL_REGISTERED",
            FederatedPrincipalProvisioned => "FEDERATED_PRINCIPAL_PROVISIONED",
            PasswordChanged => "PASSWORD_CHANGED",
            TokenRefreshed => "TOKEN_REFRESHED",
        }
    }
}

/// Audit event record
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub kind: AuditEventKind,
    /// Subject principal, when one was resolved
    pub principal_id: Option<PrincipalId>,
    /// Submitted identifier for failed attempts without a resolved principal
    pub identifier: Option<String>,
    /// Client IP, when known
    pub ip: Option<String>,
    /// Free-form context (never credentials or secrets)
    pub detail: Option<String>,
    pub at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(kind: AuditEventKind) -> Self {
        Self {
            kind,
            principal_id: None,
            identifier: None,
            ip: None,
            detail: None,
            at: Utc::now(),
        }
    }

    pub fn for_principal(kind: AuditEventKind, principal_id: PrincipalId) -> Self {
        Self {
            principal_id: Some(principal_id),
            ..Self::new(kind)
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_ip(mut self, ip: Option<String>) -> Self {
        self.ip = ip;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
