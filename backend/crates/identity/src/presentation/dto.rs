//! API DTOs (Data Transfer Objects)

use serde::{Deserialize, Serialize};

// ============================================================================
// Register
// ============================================================================

/// Registration request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub phone: Option<String>,
}

/// Registration response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub id: String,
}

// ============================================================================
// Login
// ============================================================================

/// Login request (step one)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Email or username
    pub identifier: String,
    pub password: String,
}

/// Login response when MFA is off — the legacy single-token shape that
/// simple clients depend on
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
}

/// Login response when MFA is on: a challenge, and nothing more
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MfaChallengeResponse {
    pub mfa_required: bool,
    pub mfa_token: String,
    pub expires_in_seconds: u64,
}

/// Federated login request: the provider-signed identity assertion
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedLoginRequest {
    pub assertion: String,
}

// ============================================================================
// MFA second step
// ============================================================================

/// Second login step request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyMfaLoginRequest {
    pub mfa_token: String,
    pub code: String,
}

/// Final token pair
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
}

// ============================================================================
// Refresh
// ============================================================================

/// Refresh request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Refresh response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub access_token: String,
}

// ============================================================================
// MFA setup
// ============================================================================

/// MFA setup response, shown to the user exactly once
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MfaSetupResponse {
    /// Base32 secret for manual entry
    pub secret: String,
    /// otpauth:// URI
    pub otpauth: String,
    /// Base64-encoded PNG; null when rendering was unavailable
    pub qr: Option<String>,
    /// Plaintext recovery codes (hashes are what's stored)
    pub recovery_codes: Vec<String>,
}

/// MFA setup verification request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MfaVerifySetupRequest {
    pub code: String,
}

/// MFA disable request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MfaDisableRequest {
    pub password: String,
    /// Current TOTP code
    pub code: Option<String>,
    /// Unused recovery code
    pub recovery: Option<String>,
}

/// Generic acknowledgement
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OkResponse {
    pub ok: bool,
}

// ============================================================================
// Current principal
// ============================================================================

/// Current principal info response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: String,
    pub email: String,
    pub username: String,
    pub role: String,
    pub mfa_enabled: bool,
}

/// Password change request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_deserialization() {
        let req: LoginRequest =
            serde_json::from_str(r#"{"identifier":"kato","password":"pw"}"#).unwrap();
        assert_eq!(req.identifier, "kato");
    }

    #[test]
    fn test_challenge_response_shape() {
        let json = serde_json::to_value(MfaChallengeResponse {
            mfa_required: true,
            mfa_token: "t".into(),
            expires_in_seconds: 120,
        })
        .unwrap();

        assert_eq!(json["mfaRequired"], true);
        assert_eq!(json["mfaToken"], "t");
        assert_eq!(json["expiresInSeconds"], 120);
        // no token fields may leak into the challenge shape
        assert!(json.get("token").is_none());
        assert!(json.get("accessToken").is_none());
        assert!(json.get("refreshToken").is_none());
    }

    #[test]
    fn test_legacy_token_response_shape() {
        let json = serde_json::to_value(TokenResponse { token: "jwt".into() }).unwrap();
        assert_eq!(json, serde_json::json!({"token": "jwt"}));
    }

    #[test]
    fn test_token_pair_response_shape() {
        let json = serde_json::to_value(TokenPairResponse {
            access_token: "a".into(),
            refresh_token: "r".into(),
        })
        .unwrap();
        assert_eq!(json["accessToken"], "a");
        assert_eq!(json["refreshToken"], "r");
    }

    #[test]
    fn test_mfa_setup_response_nullable_qr() {
        let json = serde_json::to_value(MfaSetupResponse {
            secret: "S".into(),
            otpauth: "otpauth://totp/x".into(),
            qr: None,
            recovery_codes: vec!["11111-22222".into()],
        })
        .unwrap();
        assert!(json["qr"].is_null());
        assert_eq!(json["recoveryCodes"][0], "11111-22222");
    }

    #[test]
    fn test_disable_request_optional_fields() {
        let req: MfaDisableRequest =
            serde_json::from_str(r#"{"password":"pw","recovery":"11111-22222"}"#).unwrap();
        assert!(req.code.is_none());
        assert_eq!(req.recovery.as_deref(), Some("11111-22222"));
    }
}
