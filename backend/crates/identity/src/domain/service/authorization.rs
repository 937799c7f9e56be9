//! Authorization Engine
//!
//! Expands a principal's single role into its ordered set of effective
//! authorities over the fixed role hierarchy, and evaluates explicit
//! authorization checks at the top of request handlers.
//!
//! The hierarchy is static configuration baked in at compile time — no
//! per-request parsing or lookups. Every decision here is a pure function
//! of `(principal, resource-ownership facts)`: no network, no database.

use crate::domain::entity::Principal;
use crate::domain::value_object::{PrincipalId, Role};

/// The role hierarchy, most to least privileged.
///
/// A role is granted its own authority plus every authority below it, so
/// the effective authorities of a role are a suffix-anchored slice of this
/// chain starting at the role's own position.
pub static ROLE_CHAIN: [Role; 5] = [
    Role::SuperAdmin,
    Role::ClinicAdmin,
    Role::Vet,
    Role::Assistant,
    Role::PetOwner,
];

/// Effective authorities of a role, ordered most to least privileged
pub fn expand_authorities(role: Role) -> &'static [Role] {
    // Rank 4 (SuperAdmin) sits at index 0; rank 0 (PetOwner) at index 4.
    let idx = (ROLE_CHAIN.len() - 1) - role.id() as usize;
    &ROLE_CHAIN[idx..]
}

/// Authenticated caller context, attached to a request after token
/// verification and passed explicitly down the call chain
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal {
    pub principal_id: PrincipalId,
    pub email: String,
    pub role: Role,
    /// Precomputed authority set for this caller's role
    pub authorities: &'static [Role],
}

impl AuthenticatedPrincipal {
    pub fn from_principal(principal: &Principal) -> Self {
        Self {
            principal_id: principal.principal_id,
            email: principal.email.to_string(),
            role: principal.role,
            authorities: expand_authorities(principal.role),
        }
    }

    /// Whether the caller holds the given authority (directly or inherited)
    pub fn has_authority(&self, authority: Role) -> bool {
        self.authorities.contains(&authority)
    }
}

/// Ownership facts about the resource being accessed, gathered by the
/// caller before the check
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceFacts {
    /// The declared owner of the resource, when it has one
    pub owner: Option<PrincipalId>,
}

impl ResourceFacts {
    pub fn owned_by(owner: PrincipalId) -> Self {
        Self { owner: Some(owner) }
    }

    pub fn unowned() -> Self {
        Self { owner: None }
    }
}

/// What a handler requires of the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Caller's authorities must include this role
    AtLeast(Role),
    /// Caller owns the resource, or holds this role's authority
    SelfOrAtLeast(Role),
}

/// Typed allow/deny result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Granted,
    Denied,
}

impl Decision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Decision::Granted)
    }
}

/// Structural ownership check: is the caller the resource's declared owner?
pub fn is_resource_owner(caller: &AuthenticatedPrincipal, owner: Option<&PrincipalId>) -> bool {
    owner.is_some_and(|o| *o == caller.principal_id)
}

/// Evaluate a requirement against the caller and the resource facts
pub fn check(
    caller: &AuthenticatedPrincipal,
    requirement: Requirement,
    facts: &ResourceFacts,
) -> Decision {
    let granted = match requirement {
        Requirement::AtLeast(role) => caller.has_authority(role),
        Requirement::SelfOrAtLeast(role) => {
            is_resource_owner(caller, facts.owner.as_ref()) || caller.has_authority(role)
        }
    };

    if granted {
        Decision::Granted
    } else {
        Decision::Denied
    }
}
