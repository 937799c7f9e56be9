//! TOTP Secret Value Object
//!
//! Wraps a TOTP secret for multi-factor authentication.
//! Uses authenticator-app compatible settings: SHA-1, 6 digits, 30 second
//! step, with ±1 step of clock-skew tolerance on verification.

use kernel::error::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use totp_rs::{Algorithm, Secret, TOTP};

/// TOTP configuration constants
const TOTP_DIGITS: usize = 6;
const TOTP_STEP: u64 = 30;
/// Accept the current step and its immediate neighbors (±30s)
const TOTP_SKEW: u8 = 1;
const TOTP_ISSUER: &str = "VetSecure";

/// TOTP secret for multi-factor authentication
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotpSecret {
    /// Base32-encoded secret
    secret_base32: String,
}

impl std::fmt::Debug for TotpSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TotpSecret")
            .field("secret_base32", &"[REDACTED]")
            .finish()
    }
}

impl TotpSecret {
    /// Generate a new cryptographically random TOTP secret
    pub fn generate() -> Self {
        let secret = Secret::generate_secret();
        Self {
            secret_base32: secret.to_encoded().to_string(),
        }
    }

    /// Create from a base32-encoded string (from storage)
    pub fn from_base32(secret: impl Into<String>) -> AppResult<Self> {
        let secret_str = secret.into();
        // Validate by trying to decode
        Secret::Encoded(secret_str.clone())
            .to_bytes()
            .map_err(|e| AppError::internal(format!("Invalid TOTP secret: {:?}", e)))?;

        Ok(Self {
            secret_base32: secret_str,
        })
    }

    /// Get the base32-encoded secret for storage or manual enrollment
    pub fn as_base32(&self) -> &str {
        &self.secret_base32
    }

    /// Create a TOTP instance labelled with the account's email
    fn to_totp(&self, account_label: &str) -> AppResult<TOTP> {
        let secret = Secret::Encoded(self.secret_base32.clone());

        TOTP::new(
            Algorithm::SHA1,
            TOTP_DIGITS,
            TOTP_SKEW,
            TOTP_STEP,
            secret
                .to_bytes()
                .map_err(|e| AppError::internal(format!("Invalid TOTP secret: {:?}", e)))?,
            Some(TOTP_ISSUER.to_string()),
            account_label.to_string(),
        )
        .map_err(|e| AppError::internal(format!("Failed to create TOTP: {}", e)))
    }

    /// Verify a submitted code against the current time, ±1 step
    pub fn verify(&self, code: &str, account_label: &str) -> AppResult<bool> {
        let totp = self.to_totp(account_label)?;
        Ok(totp.check_current(code).unwrap_or(false))
    }

    /// Verify a submitted code against an explicit Unix timestamp
    ///
    /// Exists so skew behavior is testable without sleeping.
    pub fn verify_at(&self, code: &str, timestamp: u64, account_label: &str) -> AppResult<bool> {
        let totp = self.to_totp(account_label)?;
        Ok(totp.check(code, timestamp))
    }

    /// Generate the code for an explicit Unix timestamp (tests, clients)
    pub fn code_at(&self, timestamp: u64, account_label: &str) -> AppResult<String> {
        let totp = self.to_totp(account_label)?;
        Ok(totp.generate(timestamp))
    }

    /// Generate the current code
    pub fn current_code(&self, account_label: &str) -> AppResult<String> {
        let totp = self.to_totp(account_label)?;
        totp.generate_current()
            .map_err(|e| AppError::internal(format!("Failed to generate TOTP: {}", e)))
    }

    /// The otpauth:// URI for manual enrollment
    pub fn otpauth_url(&self, account_label: &str) -> AppResult<String> {
        let totp = self.to_totp(account_label)?;
        Ok(totp.get_url())
    }

    /// Render the enrollment QR as a base64-encoded PNG
    ///
    /// QR rendering can fail in constrained environments; that failure is
    /// reported as `None` so enrollment continues with the URI + raw secret.
    pub fn qr_png_base64(&self, account_label: &str) -> Option<String> {
        let totp = self.to_totp(account_label).ok()?;
        match totp.get_qr_base64() {
            Ok(png) => Some(png),
            Err(e) => {
                tracing::warn!(error = %e, "QR rendering failed, continuing without image");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LABEL: &str = "test@example.com";

    #[test]
    fn test_generate_produces_base32() {
        let secret = TotpSecret::generate();
        assert!(!secret.as_base32().is_empty());
        // distinct per enrollment
        assert_ne!(secret.as_base32(), TotpSecret::generate().as_base32());
    }

    #[test]
    fn test_verify_current_code() {
        let secret = TotpSecret::generate();
        let code = secret.current_code(LABEL).unwrap();
        assert!(secret.verify(&code, LABEL).unwrap());
        assert!(!secret.verify("000000", LABEL).unwrap());
    }

    #[test]
    fn test_skew_accepts_adjacent_steps_only() {
        let secret = TotpSecret::generate();
        let now: u64 = 1_700_000_010; // fixed reference instant, on a step boundary

        // codes from the previous, current and next step all verify at `now`
        for t in [now - 30, now, now + 30] {
            let code = secret.code_at(t, LABEL).unwrap();
            assert!(
                secret.verify_at(&code, now, LABEL).unwrap(),
                "code at {t} should verify"
            );
        }

        // two steps away must fail
        let stale = secret.code_at(now - 90, LABEL).unwrap();
        assert!(!secret.verify_at(&stale, now, LABEL).unwrap());
        let future = secret.code_at(now + 90, LABEL).unwrap();
        assert!(!secret.verify_at(&future, now, LABEL).unwrap());
    }

    #[test]
    fn test_from_base32_roundtrip() {
        let secret = TotpSecret::generate();
        let restored = TotpSecret::from_base32(secret.as_base32().to_string()).unwrap();
        assert_eq!(secret.as_base32(), restored.as_base32());
    }

    #[test]
    fn test_from_base32_rejects_garbage() {
        assert!(TotpSecret::from_base32("!!invalid!!").is_err());
    }

    #[test]
    fn test_otpauth_url_contains_issuer_and_label() {
        let secret = TotpSecret::generate();
        let url = secret.otpauth_url(LABEL).unwrap();
        assert!(url.starts_with("otpauth://totp/"));
        assert!(url.contains("VetSecure"));
        assert!(url.contains("test%40example.com") || url.contains(LABEL));
    }

    #[test]
    fn test_qr_is_optional_but_usually_present() {
        let secret = TotpSecret::generate();
        // In a normal test environment rendering succeeds
        let qr = secret.qr_png_base64(LABEL);
        assert!(qr.is_some());
        assert!(!qr.unwrap().is_empty());
    }
}
