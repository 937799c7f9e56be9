//! Domain Services
//!
//! Stateless services over the domain model: token minting/verification,
//! authorization decisions, federated assertion verification.

pub mod authorization;
pub mod federation;
pub mod token;

pub use authorization::{
    AuthenticatedPrincipal, Decision, Requirement, ResourceFacts, check, expand_authorities,
    is_resource_owner,
};
pub use federation::{AssertionVerifier, FederatedIdentity, SignedAssertionVerifier};
pub use token::{Claims, TokenError, TokenKind, TokenService};
