//! PostgreSQL Repository Implementation
//!
//! The collaborator user store and audit sink. PII fields (`phone`) and
//! the TOTP secret are run through the [`FieldCipher`] at this boundary,
//! so they never reach storage in the clear.

use chrono::{DateTime, Utc};
use platform::encryption::FieldCipher;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entity::{AuditEvent, MfaEnrollment, Principal};
use crate::domain::repository::{AuditSink, PrincipalRepository};
use crate::domain::value_object::{
    AuthProvider, Email, PrincipalId, RecoveryCodeHashes, Role, StoredPassword, TotpSecret,
    Username,
};
use crate::error::{IdentityError, IdentityResult};

/// PostgreSQL-backed identity repository
#[derive(Clone)]
pub struct PgIdentityRepository {
    pool: PgPool,
    cipher: Arc<FieldCipher>,
}

impl PgIdentityRepository {
    pub fn new(pool: PgPool, cipher: Arc<FieldCipher>) -> Self {
        Self { pool, cipher }
    }
}

const PRINCIPAL_COLUMNS: &str = "\
    principal_id, \
    email, \
    username, \
    username_canonical, \
    phone_enc, \
    password_hash, \
    role, \
    auth_provider, \
    federated_subject, \
    mfa_enabled, \
    mfa_secret_enc, \
    mfa_recovery_hashes, \
    last_login_at, \
    created_at, \
    updated_at";

// ============================================================================
// Principal Repository Implementation
// ============================================================================

impl PrincipalRepository for PgIdentityRepository {
    async fn create(&self, principal: &Principal) -> IdentityResult<()> {
        let enc = EncryptedFields::seal(principal, &self.cipher)?;

        sqlx::query(
            r#"
            INSERT INTO principals (
                principal_id,
                email,
                username,
                username_canonical,
                phone_enc,
                password_hash,
                role,
                auth_provider,
                federated_subject,
                mfa_enabled,
                mfa_secret_enc,
                mfa_recovery_hashes,
                last_login_at,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(principal.principal_id.as_uuid())
        .bind(principal.email.as_str())
        .bind(principal.username.as_str())
        .bind(principal.username.canonical())
        .bind(&enc.phone_enc)
        .bind(principal.password_hash.as_ref().map(|h| h.as_phc_string()))
        .bind(principal.role.id())
        .bind(principal.auth_provider.code())
        .bind(&principal.federated_subject)
        .bind(principal.mfa_enabled)
        .bind(&enc.mfa_secret_enc)
        .bind(&enc.mfa_recovery_hashes)
        .bind(principal.last_login_at)
        .bind(principal.created_at)
        .bind(principal.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, principal_id: &PrincipalId) -> IdentityResult<Option<Principal>> {
        let row = sqlx::query_as::<_, PrincipalRow>(&format!(
            "SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE principal_id = $1"
        ))
        .bind(principal_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_principal(&self.cipher)).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> IdentityResult<Option<Principal>> {
        let row = sqlx::query_as::<_, PrincipalRow>(&format!(
            "SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_principal(&self.cipher)).transpose()
    }

    async fn find_by_username(&self, username: &Username) -> IdentityResult<Option<Principal>> {
        let row = sqlx::query_as::<_, PrincipalRow>(&format!(
            "SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE username_canonical = $1"
        ))
        .bind(username.canonical())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_principal(&self.cipher)).transpose()
    }

    async fn exists_by_email(&self, email: &Email) -> IdentityResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM principals WHERE email = $1)")
                .bind(email.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn exists_by_username(&self, username: &Username) -> IdentityResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM principals WHERE username_canonical = $1)",
        )
        .bind(username.canonical())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn update(&self, principal: &Principal) -> IdentityResult<()> {
        let enc = EncryptedFields::seal(principal, &self.cipher)?;

        sqlx::query(
            r#"
            UPDATE principals SET
                email = $2,
                username = $3,
                username_canonical = $4,
                phone_enc = $5,
                password_hash = $6,
                role = $7,
                auth_provider = $8,
                federated_subject = $9,
                mfa_enabled = $10,
                mfa_secret_enc = $11,
                mfa_recovery_hashes = $12,
                last_login_at = $13,
                updated_at = $14
            WHERE principal_id = $1
            "#,
        )
        .bind(principal.principal_id.as_uuid())
        .bind(principal.email.as_str())
        .bind(principal.username.as_str())
        .bind(principal.username.canonical())
        .bind(&enc.phone_enc)
        .bind(principal.password_hash.as_ref().map(|h| h.as_phc_string()))
        .bind(principal.role.id())
        .bind(principal.auth_provider.code())
        .bind(&principal.federated_subject)
        .bind(principal.mfa_enabled)
        .bind(&enc.mfa_secret_enc)
        .bind(&enc.mfa_recovery_hashes)
        .bind(principal.last_login_at)
        .bind(principal.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ============================================================================
// Audit Sink Implementation
// ============================================================================

impl AuditSink for PgIdentityRepository {
    async fn record(&self, event: &AuditEvent) -> IdentityResult<()> {
        sqlx::query(
            r#"
            INSERT INTO security_audit_log (
                event,
                principal_id,
                identifier,
                ip_address,
                detail,
                occurred_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.kind.code())
        .bind(event.principal_id.map(|id| *id.as_uuid()))
        .bind(&event.identifier)
        .bind(&event.ip)
        .bind(&event.detail)
        .bind(event.at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ============================================================================
// Row Mapping
// ============================================================================

/// Fields that pass through the cipher on the way to storage
struct EncryptedFields {
    phone_enc: Option<String>,
    mfa_secret_enc: Option<String>,
    mfa_recovery_hashes: Option<String>,
}

impl EncryptedFields {
    fn seal(principal: &Principal, cipher: &FieldCipher) -> IdentityResult<Self> {
        let phone_enc = cipher
            .encrypt_optional(principal.phone.as_deref())
            .map_err(|e| IdentityError::Internal(format!("Field encryption failed: {}", e)))?;

        let (mfa_secret_enc, mfa_recovery_hashes) = match &principal.mfa_enrollment {
            Some(enrollment) => {
                let secret_enc = cipher
                    .encrypt(enrollment.totp_secret.as_base32())
                    .map_err(|e| {
                        IdentityError::Internal(format!("Field encryption failed: {}", e))
                    })?;
                (
                    Some(secret_enc),
                    Some(enrollment.recovery_hashes.storage_string()),
                )
            }
            None => (None, None),
        };

        Ok(Self {
            phone_enc,
            mfa_secret_enc,
            mfa_recovery_hashes,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PrincipalRow {
    principal_id: uuid::Uuid,
    email: String,
    username: String,
    #[allow(dead_code)]
    username_canonical: String,
    phone_enc: Option<String>,
    password_hash: Option<String>,
    role: i16,
    auth_provider: String,
    federated_subject: Option<String>,
    mfa_enabled: bool,
    mfa_secret_enc: Option<String>,
    mfa_recovery_hashes: Option<String>,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PrincipalRow {
    fn into_principal(self, cipher: &FieldCipher) -> IdentityResult<Principal> {
        let role = Role::from_id(self.role)
            .ok_or_else(|| IdentityError::Internal(format!("Unknown role id {}", self.role)))?;

        let auth_provider = AuthProvider::from_code(&self.auth_provider).ok_or_else(|| {
            IdentityError::Internal(format!("Unknown auth provider {}", self.auth_provider))
        })?;

        let phone = cipher
            .decrypt_optional(self.phone_enc.as_deref())
            .map_err(|e| IdentityError::Internal(format!("Field decryption failed: {}", e)))?;

        // Secret and recovery hashes must be both present or both absent;
        // anything else is a data bug, not a user error.
        let mfa_enrollment = match (self.mfa_secret_enc, self.mfa_recovery_hashes) {
            (Some(secret_enc), Some(hashes)) => {
                let secret_b32 = cipher.decrypt(&secret_enc).map_err(|e| {
                    IdentityError::Internal(format!("Field decryption failed: {}", e))
                })?;
                Some(MfaEnrollment {
                    totp_secret: TotpSecret::from_base32(secret_b32)?,
                    recovery_hashes: RecoveryCodeHashes::from_storage(&hashes),
                })
            }
            (None, None) => None,
            _ => return Err(IdentityError::InconsistentMfaState),
        };

        if self.mfa_enabled && mfa_enrollment.is_none() {
            return Err(IdentityError::InconsistentMfaState);
        }

        let password_hash = self
            .password_hash
            .map(StoredPassword::from_phc_string)
            .transpose()?;

        Ok(Principal {
            principal_id: PrincipalId::from_uuid(self.principal_id),
            email: Email::from_db(self.email),
            username: Username::from_db(self.username),
            phone,
            password_hash,
            role,
            auth_provider,
            federated_subject: self.federated_subject,
            mfa_enabled: self.mfa_enabled,
            mfa_enrollment,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
