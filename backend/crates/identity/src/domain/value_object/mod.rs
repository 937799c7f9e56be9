//! Value Objects
//!
//! Validated, immutable domain primitives.

pub mod auth_provider;
pub mod email;
pub mod password;
pub mod principal_id;
pub mod recovery_code;
pub mod role;
pub mod totp_secret;
pub mod username;

// Re-exports
pub use auth_provider::AuthProvider;
pub use email::Email;
pub use password::{RawPassword, StoredPassword};
pub use principal_id::PrincipalId;
pub use recovery_code::{RECOVERY_CODE_COUNT, RecoveryCodeHashes, generate_recovery_codes};
pub use role::Role;
pub use totp_secret::TotpSecret;
pub use username::Username;
