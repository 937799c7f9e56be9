//! Role Value Object
//!
//! A principal holds exactly one role out of a small fixed enumeration
//! arranged in a strict total order (most to least privileged):
//!
//! `SUPER_ADMIN > CLINIC_ADMIN > VET > ASSISTANT > PET_OWNER`
//!
//! Authority expansion over this order lives in
//! [`crate::domain::service::authorization`].

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum Role {
    #[default]
    PetOwner = 0,
    Assistant = 1,
    Vet = 2,
    ClinicAdmin = 3,
    SuperAdmin = 4,
}

impl Role {
    /// Numeric id for storage; doubles as the privilege rank
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    /// Stable wire/storage code
    #[inline]
    pub const fn code(&self) -> &'static str {
        use Role::*;
        match self {
            PetOwner => "PET_OWNER",
            Assistant => "ASSISTANT",
            Vet => "VET",
            ClinicAdmin => "CLINIC_ADMIN",
            SuperAdmin => "SUPER_ADMIN",
        }
    }

    /// True if this role is at least as privileged as `other`
    #[inline]
    pub const fn is_at_least(&self, other: Role) -> bool {
        self.id() >= other.id()
    }

    #[inline]
    pub const fn is_clinic_admin_or_higher(&self) -> bool {
        self.is_at_least(Role::ClinicAdmin)
    }

    #[inline]
    pub fn from_id(id: i16) -> Option<Self> {
        use Role::*;
        match id {
            0 => Some(PetOwner),
            1 => Some(Assistant),
            2 => Some(Vet),
            3 => Some(ClinicAdmin),
            4 => Some(SuperAdmin),
            _ => None,
        }
    }

    #[inline]
    pub fn from_code(code: &str) -> Option<Self> {
        use Role::*;
        match code {
            "PET_OWNER" => Some(PetOwner),
            "ASSISTANT" => Some(Assistant),
            "VET" => Some(Vet),
            "CLINIC_ADMIN" => Some(ClinicAdmin),
            "SUPER_ADMIN" => Some(SuperAdmin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_id() {
        assert_eq!(Role::from_id(0), Some(Role::PetOwner));
        assert_eq!(Role::from_id(1), Some(Role::Assistant));
        assert_eq!(Role::from_id(2), Some(Role::Vet));
        assert_eq!(Role::from_id(3), Some(Role::ClinicAdmin));
        assert_eq!(Role::from_id(4), Some(Role::SuperAdmin));
        assert_eq!(Role::from_id(99), None);
    }

    #[test]
    fn test_role_from_code() {
        assert_eq!(Role::from_code("PET_OWNER"), Some(Role::PetOwner));
        assert_eq!(Role::from_code("SUPER_ADMIN"), Some(Role::SuperAdmin));
        assert_eq!(Role::from_code("PET"), None); // legacy role, no longer valid
    }

    #[test]
    fn test_role_order_is_strict() {
        assert!(Role::SuperAdmin.is_at_least(Role::ClinicAdmin));
        assert!(Role::ClinicAdmin.is_at_least(Role::Vet));
        assert!(Role::Vet.is_at_least(Role::Assistant));
        assert!(Role::Assistant.is_at_least(Role::PetOwner));

        assert!(!Role::PetOwner.is_at_least(Role::Assistant));
        assert!(!Role::Vet.is_at_least(Role::ClinicAdmin));

        // reflexive
        assert!(Role::Vet.is_at_least(Role::Vet));
    }

    #[test]
    fn test_role_default_is_least_privileged() {
        assert_eq!(Role::default(), Role::PetOwner);
    }

    #[test]
    fn test_role_serde_codes() {
        let json = serde_json::to_string(&Role::ClinicAdmin).unwrap();
        assert_eq!(json, "\"CLINIC_ADMIN\"");
        let role: Role = serde_json::from_str("\"VET\"").unwrap();
        assert_eq!(role, Role::Vet);
    }
}
