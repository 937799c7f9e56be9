//! Authentication Provider Value Object

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a principal authenticates.
///
/// `Local` is classic email/username + password. `Federated` accounts were
/// created by (or linked to) an external identity provider; they keep a
/// random, practically unusable password hash so the password path stays
/// structurally valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthProvider {
    #[default]
    Local,
    Federated,
}

impl AuthProvider {
    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            AuthProvider::Local => "LOCAL",
            AuthProvider::Federated => "FEDERATED",
        }
    }

    #[inline]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "LOCAL" => Some(AuthProvider::Local),
            "FEDERATED" => Some(AuthProvider::Federated),
            _ => None,
        }
    }
}

impl fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
