//! Application Configuration
//!
//! Configuration for the identity application layer. Built once at process
//! start; the token service and every use case read from it.

use std::time::Duration;

use kernel::error::app_error::{AppError, AppResult};

use crate::domain::service::TokenService;

/// Minimum signing secret length in bytes
pub const MIN_TOKEN_SECRET_LENGTH: usize = 32;

/// Identity application configuration
#[derive(Clone)]
pub struct IdentityConfig {
    /// HS256 signing secret for all token kinds (≥ 32 bytes)
    pub token_secret: Vec<u8>,
    /// `iss` claim required on every token
    pub issuer: String,
    /// `aud` claim required on every token
    pub audience: String,
    /// Access token lifetime (15 minutes)
    pub access_ttl: Duration,
    /// Refresh token lifetime (14 days)
    pub refresh_ttl: Duration,
    /// MFA challenge lifetime (120 seconds)
    pub mfa_ttl: Duration,
    /// Clock-skew allowance on verification (30 seconds)
    pub clock_skew: Duration,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            token_secret: vec![0u8; MIN_TOKEN_SECRET_LENGTH],
            issuer: "vetsecure".to_string(),
            audience: "vetsecure-api".to_string(),
            access_ttl: Duration::from_secs(15 * 60),
            refresh_ttl: Duration::from_secs(14 * 24 * 3600),
            mfa_ttl: Duration::from_secs(120),
            clock_skew: Duration::from_secs(30),
            password_pepper: None,
        }
    }
}

impl IdentityConfig {
    /// Create config with an explicit signing secret
    pub fn new(token_secret: Vec<u8>) -> AppResult<Self> {
        if token_secret.len() < MIN_TOKEN_SECRET_LENGTH {
            return Err(AppError::internal(format!(
                "Token secret must be at least {} bytes",
                MIN_TOKEN_SECRET_LENGTH
            )));
        }
        Ok(Self {
            token_secret,
            ..Default::default()
        })
    }

    /// Create config with a random signing secret (for development)
    pub fn with_random_secret() -> Self {
        use rand::RngCore;
        let mut secret = vec![0u8; MIN_TOKEN_SECRET_LENGTH];
        rand::rng().fill_bytes(&mut secret);
        Self {
            token_secret: secret,
            ..Default::default()
        }
    }

    /// Development configuration
    pub fn development() -> Self {
        Self::with_random_secret()
    }

    /// Build the token service for this configuration
    pub fn token_service(&self) -> TokenService {
        TokenService::new(
            &self.token_secret,
            self.issuer.clone(),
            self.audience.clone(),
            self.access_ttl,
            self.refresh_ttl,
            self.mfa_ttl,
            self.clock_skew,
        )
    }

    /// Get password pepper as slice
    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("token_secret", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("mfa_ttl", &self.mfa_ttl)
            .field("clock_skew", &self.clock_skew)
            .field(
                "password_pepper",
                &self.password_pepper.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ttls() {
        let config = IdentityConfig::default();
        assert_eq!(config.access_ttl, Duration::from_secs(900));
        assert_eq!(config.refresh_ttl, Duration::from_secs(1_209_600));
        assert_eq!(config.mfa_ttl, Duration::from_secs(120));
        assert_eq!(config.clock_skew, Duration::from_secs(30));
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(IdentityConfig::new(vec![1u8; 16]).is_err());
        assert!(IdentityConfig::new(vec![1u8; 32]).is_ok());
    }

    #[test]
    fn test_random_secrets_differ() {
        let a = IdentityConfig::with_random_secret();
        let b = IdentityConfig::with_random_secret();
        assert_ne!(a.token_secret, b.token_secret);
    }

    #[test]
    fn test_token_service_construction() {
        let config = IdentityConfig::with_random_secret();
        let tokens = config.token_service();
        assert_eq!(tokens.mfa_ttl_seconds(), 120);
    }
}
