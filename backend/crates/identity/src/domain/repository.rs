//! Repository Traits
//!
//! Narrow interfaces to the collaborator user store and audit sink.
//! Implementations live in the infrastructure layer.
//!
//! Read-modify-write sequences on a principal (enabling MFA, consuming a
//! recovery code) are expected to run inside a transaction boundary owned
//! by the implementing store; two concurrent updates to the same principal
//! must not interleave.

use crate::domain::entity::{AuditEvent, Principal};
use crate::domain::value_object::{Email, PrincipalId, Username};
use crate::error::IdentityResult;

/// Principal (user store) repository trait
#[trait_variant::make(PrincipalRepository: Send)]
pub trait LocalPrincipalRepository {
    /// Persist a new principal
    async fn create(&self, principal: &Principal) -> IdentityResult<()>;

    /// Find by internal ID
    async fn find_by_id(&self, principal_id: &PrincipalId) -> IdentityResult<Option<Principal>>;

    /// Find by email (case-normalized by the Email value object)
    async fn find_by_email(&self, email: &Email) -> IdentityResult<Option<Principal>>;

    /// Find by username (canonical form)
    async fn find_by_username(&self, username: &Username) -> IdentityResult<Option<Principal>>;

    /// Check if an email is taken
    async fn exists_by_email(&self, email: &Email) -> IdentityResult<bool>;

    /// Check if a username is taken
    async fn exists_by_username(&self, username: &Username) -> IdentityResult<bool>;

    /// Persist changes to an existing principal
    async fn update(&self, principal: &Principal) -> IdentityResult<()>;
}

/// Audit sink trait
///
/// Recording is best-effort from the caller's perspective: use cases log
/// and swallow sink errors rather than failing the request.
#[trait_variant::make(AuditSink: Send)]
pub trait LocalAuditSink {
    async fn record(&self, event: &AuditEvent) -> IdentityResult<()>;
}
