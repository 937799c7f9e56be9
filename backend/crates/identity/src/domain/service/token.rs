//! Token Service
//!
//! Mints and verifies the three token kinds of the subsystem: access,
//! refresh and MFA-challenge. Tokens are self-contained signed claim sets
//! (HS256); nothing is persisted and there is no server-side revocation —
//! expiry is the only invalidation mechanism.
//!
//! All kinds are signed with the same key and distinguished purely by the
//! `type` (and `scope`) claim. [`TokenService::verify`] therefore only
//! checks signature, issuer, audience and expiry; **every caller must
//! assert the expected kind** for the operation it performs. A valid
//! signature alone never authorizes anything.

use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind as JwtErrorKind,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::domain::entity::Principal;
use crate::domain::value_object::PrincipalId;

/// Scope claim value carried by MFA challenge tokens
const MFA_SCOPE: &str = "MFA";

/// Token kind, carried in the `type` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    #[serde(rename = "ACCESS")]
    Access,
    #[serde(rename = "REFRESH")]
    Refresh,
    #[serde(rename = "MFA")]
    Mfa,
}

/// Signed claim set
///
/// `sub` is always the principal id (UUID string). Refresh tokens carry no
/// email/username/role so they cannot be used to authorize actions directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Claims {
    /// Parse the subject back into a principal id
    pub fn principal_id(&self) -> Option<PrincipalId> {
        PrincipalId::parse_str(&self.sub).ok()
    }
}

/// Token verification failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("token issued by another deployment")]
    WrongIssuer,
    #[error("token intended for another audience")]
    WrongAudience,
    #[error("malformed token")]
    Malformed,
}

/// Stateless token issuer/verifier
///
/// Safe to share across request handlers; holds only derived key material
/// and static configuration.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    mfa_ttl: Duration,
    leeway: Duration,
}

impl TokenService {
    pub fn new(
        secret: &[u8],
        issuer: impl Into<String>,
        audience: impl Into<String>,
        access_ttl: Duration,
        refresh_ttl: Duration,
        mfa_ttl: Duration,
        leeway: Duration,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            audience: audience.into(),
            access_ttl,
            refresh_ttl,
            mfa_ttl,
            leeway,
        }
    }

    /// MFA challenge lifetime, surfaced to clients as `expiresInSeconds`
    pub fn mfa_ttl_seconds(&self) -> u64 {
        self.mfa_ttl.as_secs()
    }

    // ========================================================================
    // Issuance
    // ========================================================================

    /// Mint an access token for an authenticated principal
    pub fn issue_access_token(&self, principal: &Principal) -> Result<String, TokenError> {
        let claims = self.base_claims(
            principal.principal_id.to_string(),
            TokenKind::Access,
            self.access_ttl,
        );
        self.encode_claims(&Claims {
            email: Some(principal.email.to_string()),
            username: Some(principal.username.to_string()),
            role: Some(principal.role.code().to_string()),
            ..claims
        })
    }

    /// Mint a refresh token; deliberately carries no profile claims
    pub fn issue_refresh_token(&self, principal: &Principal) -> Result<String, TokenError> {
        let claims = self.base_claims(
            principal.principal_id.to_string(),
            TokenKind::Refresh,
            self.refresh_ttl,
        );
        self.encode_claims(&claims)
    }

    /// Mint a short-lived MFA challenge token
    ///
    /// Authorizes nothing except submitting a second-factor code.
    pub fn issue_mfa_challenge(&self, principal_id: PrincipalId) -> Result<String, TokenError> {
        let claims = self.base_claims(principal_id.to_string(), TokenKind::Mfa, self.mfa_ttl);
        self.encode_claims(&Claims {
            scope: Some(MFA_SCOPE.to_string()),
            ..claims
        })
    }

    fn base_claims(&self, sub: String, kind: TokenKind, ttl: Duration) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            sub,
            iat: now,
            exp: now + ttl.as_secs() as i64,
            kind,
            scope: None,
            email: None,
            username: None,
            role: None,
        }
    }

    /// Sign an explicit claim set
    ///
    /// Public within the crate so tests can craft tokens with arbitrary
    /// issue/expiry instants.
    pub(crate) fn encode_claims(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|_| TokenError::Malformed)
    }

    // ========================================================================
    // Verification
    // ========================================================================

    /// Validate signature, issuer, audience and expiry (with bounded
    /// clock-skew allowance) and return the claims
    ///
    /// Does NOT check the `type`/`scope` claims; callers must assert the
    /// kind they expect.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway.as_secs();
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                JwtErrorKind::ExpiredSignature => TokenError::Expired,
                JwtErrorKind::InvalidSignature => TokenError::InvalidSignature,
                JwtErrorKind::InvalidIssuer => TokenError::WrongIssuer,
                JwtErrorKind::InvalidAudience => TokenError::WrongAudience,
                _ => TokenError::Malformed,
            })
    }

    /// Resolve an MFA challenge token to its principal id
    ///
    /// Additionally requires `scope == "MFA"`. Collapses every failure to
    /// `None` so callers treat an invalid challenge exactly like a wrong
    /// code.
    pub fn resolve_mfa_challenge(&self, token: &str) -> Option<PrincipalId> {
        let claims = self.verify(token).ok()?;
        if claims.kind != TokenKind::Mfa || claims.scope.as_deref() != Some(MFA_SCOPE) {
            return None;
        }
        claims.principal_id()
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}
