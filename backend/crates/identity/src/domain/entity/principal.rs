//! Principal Entity
//!
//! The single account aggregate of the identity subsystem. Carries both the
//! public profile fields and the sensitive credential state (password hash,
//! MFA enrollment).
//!
//! ## MFA invariant
//! The TOTP secret and the recovery code hashes are generated together and
//! cleared together. The model enforces this by holding both inside one
//! `Option<MfaEnrollment>`; a storage row with only one of the two present
//! is a data bug and fails row decoding, it never constructs a `Principal`.

use chrono::{DateTime, Utc};

use crate::domain::value_object::{
    AuthProvider, Email, PrincipalId, RecoveryCodeHashes, Role, StoredPassword, TotpSecret,
    Username,
};

/// MFA enrollment data, present from setup until disable
///
/// `Principal::mfa_enabled` stays false between setup and the first
/// successful code verification, so a half-finished enrollment never locks
/// an account behind a second factor the user has not proven they hold.
#[derive(Debug, Clone)]
pub struct MfaEnrollment {
    /// Shared TOTP secret (Base32)
    pub totp_secret: TotpSecret,
    /// One-way hashes of the unused recovery codes
    pub recovery_hashes: RecoveryCodeHashes,
}

/// Principal entity
#[derive(Debug, Clone)]
pub struct Principal {
    /// Internal UUID identifier; also the token subject
    pub principal_id: PrincipalId,
    /// Login identifier and authenticator account label
    pub email: Email,
    /// Alternative login identifier / display handle
    pub username: Username,
    /// Contact number (PII, encrypted at the storage boundary)
    pub phone: Option<String>,
    /// Argon2id hash; federated principals hold a random unusable one,
    /// legacy federated rows may have none at all
    pub password_hash: Option<StoredPassword>,
    /// Single role; effective authorities derive from the role chain
    pub role: Role,
    /// How this account authenticates
    pub auth_provider: AuthProvider,
    /// Stable subject id at the external identity provider
    pub federated_subject: Option<String>,
    /// True only after the first successful TOTP verification
    pub mfa_enabled: bool,
    /// Secret + recovery hashes, both present or both absent
    pub mfa_enrollment: Option<MfaEnrollment>,
    /// Last successful login time
    pub last_login_at: Option<DateTime<Utc>>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Principal {
    /// Create a new locally registered principal
    pub fn new_local(email: Email, username: Username, password_hash: StoredPassword) -> Self {
        let now = Utc::now();
        Self {
            principal_id: PrincipalId::new(),
            email,
            username,
            phone: None,
            password_hash: Some(password_hash),
            role: Role::default(),
            auth_provider: AuthProvider::Local,
            federated_subject: None,
            mfa_enabled: false,
            mfa_enrollment: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Provision a principal on first federated login
    ///
    /// The password hash is random and never communicated, keeping the
    /// password path structurally valid but practically unusable.
    pub fn new_federated(
        email: Email,
        username: Username,
        federated_subject: String,
        unusable_password: StoredPassword,
    ) -> Self {
        let mut principal = Self::new_local(email, username, unusable_password);
        principal.auth_provider = AuthProvider::Federated;
        principal.federated_subject = Some(federated_subject);
        principal
    }

    /// Record successful login
    pub fn record_login(&mut self) {
        let now = Utc::now();
        self.last_login_at = Some(now);
        self.updated_at = now;
    }

    /// Link the external provider's subject id (first federated login of an
    /// existing local account)
    pub fn link_federated_subject(&mut self, subject: String) {
        if self.federated_subject.is_none() {
            self.federated_subject = Some(subject);
            self.auth_provider = AuthProvider::Federated;
            self.updated_at = Utc::now();
        }
    }

    /// Replace the password hash (password change)
    pub fn set_password(&mut self, password_hash: StoredPassword) {
        self.password_hash = Some(password_hash);
        self.updated_at = Utc::now();
    }

    /// Whether login must go through the MFA challenge step
    pub fn requires_mfa(&self) -> bool {
        self.mfa_enabled && self.mfa_enrollment.is_some()
    }

    /// Store freshly generated enrollment data; MFA stays off until the
    /// first code verifies
    pub fn enroll_mfa(&mut self, totp_secret: TotpSecret, recovery_hashes: RecoveryCodeHashes) {
        self.mfa_enrollment = Some(MfaEnrollment {
            totp_secret,
            recovery_hashes,
        });
        self.mfa_enabled = false;
        self.updated_at = Utc::now();
    }

    /// Flip MFA on after the first successful code check
    ///
    /// Returns false when there is nothing enrolled to activate.
    pub fn activate_mfa(&mut self) -> bool {
        if self.mfa_enrollment.is_none() {
            return false;
        }
        self.mfa_enabled = true;
        self.updated_at = Utc::now();
        true
    }

    /// Clear all MFA state (secret and remaining recovery codes)
    pub fn disable_mfa(&mut self) {
        self.mfa_enrollment = None;
        self.mfa_enabled = false;
        self.updated_at = Utc::now();
    }

    /// Verify a TOTP code against the enrolled secret
    pub fn verify_mfa_code(&self, code: &str) -> bool {
        match &self.mfa_enrollment {
            Some(enrollment) => enrollment
                .totp_secret
                .verify(code, self.email.as_str())
                .unwrap_or(false),
            None => false,
        }
    }

    /// Consume one recovery code
    ///
    /// On success the code's hash is removed from the in-memory set; the
    /// caller must persist this principal for the consumption to stick.
    pub fn consume_recovery_code(&mut self, submitted: &str) -> bool {
        let Some(enrollment) = &mut self.mfa_enrollment else {
            return false;
        };

        match enrollment.recovery_hashes.consume(submitted) {
            Some(updated) => {
                enrollment.recovery_hashes = updated;
                self.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::{RawPassword, generate_recovery_codes};

    fn test_principal() -> Principal {
        let raw = RawPassword::new("correct horse battery staple".to_string()).unwrap();
        Principal::new_local(
            Email::new("kato@example.com").unwrap(),
            Username::new("kato").unwrap(),
            StoredPassword::from_raw(&raw, None).unwrap(),
        )
    }

    fn enrolled_principal() -> (Principal, Vec<String>) {
        let mut principal = test_principal();
        let codes = generate_recovery_codes();
        principal.enroll_mfa(
            TotpSecret::generate(),
            RecoveryCodeHashes::from_codes(&codes[..2]).unwrap(),
        );
        (principal, codes[..2].to_vec())
    }

    #[test]
    fn test_new_local_defaults() {
        let principal = test_principal();
        assert_eq!(principal.role, Role::PetOwner);
        assert_eq!(principal.auth_provider, AuthProvider::Local);
        assert!(!principal.mfa_enabled);
        assert!(principal.mfa_enrollment.is_none());
        assert!(!principal.requires_mfa());
    }

    #[test]
    fn test_new_federated_carries_subject() {
        let raw = RawPassword::generate_unusable();
        let principal = Principal::new_federated(
            Email::new("sato@example.com").unwrap(),
            Username::new("sato").unwrap(),
            "idp-subject-123".to_string(),
            StoredPassword::from_raw(&raw, None).unwrap(),
        );
        assert_eq!(principal.auth_provider, AuthProvider::Federated);
        assert_eq!(principal.federated_subject.as_deref(), Some("idp-subject-123"));
    }

    #[test]
    fn test_enrollment_does_not_enable_mfa() {
        let (principal, _) = enrolled_principal();
        // attacker who saw the secret mid-setup gains nothing
        assert!(!principal.mfa_enabled);
        assert!(!principal.requires_mfa());
        assert!(principal.mfa_enrollment.is_some());
    }

    #[test]
    fn test_activate_then_disable() {
        let (mut principal, _) = enrolled_principal();

        assert!(principal.activate_mfa());
        assert!(principal.requires_mfa());

        principal.disable_mfa();
        assert!(!principal.mfa_enabled);
        assert!(principal.mfa_enrollment.is_none());
    }

    #[test]
    fn test_activate_without_enrollment_fails() {
        let mut principal = test_principal();
        assert!(!principal.activate_mfa());
        assert!(!principal.mfa_enabled);
    }

    #[test]
    fn test_verify_mfa_code() {
        let (principal, _) = enrolled_principal();
        let secret = &principal.mfa_enrollment.as_ref().unwrap().totp_secret;
        let code = secret.current_code(principal.email.as_str()).unwrap();

        assert!(principal.verify_mfa_code(&code));
        assert!(!principal.verify_mfa_code("000000"));
    }

    #[test]
    fn test_verify_mfa_code_without_enrollment() {
        let principal = test_principal();
        assert!(!principal.verify_mfa_code("123456"));
    }

    #[test]
    fn test_consume_recovery_code_once() {
        let (mut principal, codes) = enrolled_principal();

        assert!(principal.consume_recovery_code(&codes[0]));
        // same code again: the hash is gone
        assert!(!principal.consume_recovery_code(&codes[0]));
        // the other code still works
        assert!(principal.consume_recovery_code(&codes[1]));
    }

    #[test]
    fn test_link_federated_subject_is_idempotent() {
        let mut principal = test_principal();
        principal.link_federated_subject("sub-1".to_string());
        principal.link_federated_subject("sub-2".to_string());
        assert_eq!(principal.federated_subject.as_deref(), Some("sub-1"));
    }

    #[test]
    fn test_record_login_updates_timestamps() {
        let mut principal = test_principal();
        assert!(principal.last_login_at.is_none());
        principal.record_login();
        assert!(principal.last_login_at.is_some());
    }
}
