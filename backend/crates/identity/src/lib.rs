//! Identity Backend Module
//!
//! The identity-and-trust subsystem every request passes through.
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, domain services, repository traits
//! - `application/` - Use cases and application services
//! - `infra/` - Store implementations (PostgreSQL, in-memory)
//! - `presentation/` - HTTP handlers, DTOs, router, request authenticator
//!
//! ## Features
//! - Signed, time-boxed tokens (access / refresh / MFA-challenge)
//! - TOTP-based MFA with single-use recovery codes
//! - Three-step login protocol; password and federated paths share one
//!   token-issuance decision point
//! - Role-based authorization over a fixed role hierarchy
//! - Field-level encryption of PII at the storage boundary
//!
//! ## Security Model
//! - Passwords hashed with Argon2id (NIST SP 800-63B compliant)
//! - Token kinds distinguished by claim, asserted by every consumer
//! - MFA enrollment is inert until the first code verifies
//! - No server-side revocation: expiry bounds token compromise

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use application::config::IdentityConfig;
pub use error::{IdentityError, IdentityResult};
pub use infra::postgres::PgIdentityRepository;
pub use presentation::router::{identity_router, identity_router_generic};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

// Convenience re-exports
pub mod config {
    pub use crate::application::config::*;
}

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod handlers {
    pub use crate::presentation::handlers::*;
}

pub mod store {
    pub use crate::infra::memory::InMemoryIdentityRepository;
    pub use crate::infra::postgres::PgIdentityRepository as IdentityStore;
}

pub mod router {
    pub use crate::presentation::router::*;
}

pub mod middleware {
    pub use crate::presentation::middleware::*;
}
