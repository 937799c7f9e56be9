//! Federated Identity
//!
//! The external identity provider authenticates the user and hands this
//! subsystem a *verified* identity assertion; everything up to that point
//! (authorization code exchange, provider sessions) is a collaborator
//! concern. [`AssertionVerifier`] is the narrow seam: given the signed
//! assertion string, produce the trusted `{email, subject}` pair or nothing.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;

/// Verified identity assertion from an external provider
#[derive(Debug, Clone)]
pub struct FederatedIdentity {
    /// Email attested by the provider
    pub email: String,
    /// Stable subject id at the provider
    pub subject: String,
    /// Display name, when the provider shares one
    pub display_name: Option<String>,
}

/// Turns an incoming signed assertion into a trusted identity
///
/// Implementations must reject anything they cannot positively verify;
/// a `None` here surfaces to the client as a generic credential failure.
pub trait AssertionVerifier: Send + Sync {
    fn verify(&self, assertion: &str) -> Option<FederatedIdentity>;
}

/// Claim set of a gateway-signed identity assertion
#[derive(Debug, Deserialize)]
struct AssertionClaims {
    sub: String,
    email: String,
    #[serde(default)]
    name: Option<String>,
    #[allow(dead_code)]
    exp: i64,
}

/// Verifier for assertions signed by a trusted authentication gateway
///
/// The gateway completes the OAuth2 dance with the upstream provider and
/// re-signs the result with a key shared with this service. Issuer and
/// audience pin the assertion to this deployment.
pub struct SignedAssertionVerifier {
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
}

impl SignedAssertionVerifier {
    pub fn new(secret: &[u8], issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }
}

impl AssertionVerifier for SignedAssertionVerifier {
    fn verify(&self, assertion: &str) -> Option<FederatedIdentity> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let claims = match decode::<AssertionClaims>(assertion, &self.decoding_key, &validation) {
            Ok(data) => data.claims,
            Err(err) => {
                tracing::debug!(error = %err, "Rejected federated assertion");
                return None;
            }
        };

        if claims.email.trim().is_empty() || claims.sub.trim().is_empty() {
            tracing::debug!("Federated assertion missing email or subject");
            return None;
        }

        Some(FederatedIdentity {
            email: claims.email,
            subject: claims.sub,
            display_name: claims.name,
        })
    }
}
