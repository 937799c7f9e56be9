//! Recovery Code Value Objects
//!
//! A fixed-size batch of single-use backup credentials generated together
//! at MFA enrollment. Plaintext codes are shown to the user exactly once;
//! only one-way hashes are stored (newline-joined, one PHC string per code).
//!
//! Consuming a code removes exactly that hash from the set and is
//! irreversible; regenerating the secret replaces the whole set.

use kernel::error::app_error::{AppError, AppResult};
use platform::password::{hash_opaque_secret, verify_opaque_secret};
use rand::Rng;

/// Number of codes in a freshly generated set
pub const RECOVERY_CODE_COUNT: usize = 10;

/// Generate a batch of human-readable recovery codes
///
/// Format: two 5-digit groups, e.g. `12345-67890`.
pub fn generate_recovery_codes() -> Vec<String> {
    let mut rng = rand::rng();
    (0..RECOVERY_CODE_COUNT)
        .map(|_| {
            let left: u32 = rng.random_range(0..100_000);
            let right: u32 = rng.random_range(0..100_000);
            format!("{:05}-{:05}", left, right)
        })
        .collect()
}

/// Ordered set of one-way recovery code hashes, as persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryCodeHashes {
    hashes: Vec<String>,
}

impl RecoveryCodeHashes {
    /// Hash a freshly generated batch of plaintext codes for storage
    pub fn from_codes(codes: &[String]) -> AppResult<Self> {
        let hashes = codes
            .iter()
            .map(|code| {
                hash_opaque_secret(code)
                    .map_err(|e| AppError::internal(format!("Recovery code hashing failed: {}", e)))
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self { hashes })
    }

    /// Restore from the newline-joined storage representation
    pub fn from_storage(stored: &str) -> Self {
        Self {
            hashes: stored
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| line.to_string())
                .collect(),
        }
    }

    /// Newline-joined representation for storage
    pub fn storage_string(&self) -> String {
        self.hashes.join("\n")
    }

    /// Attempt to consume a submitted code
    ///
    /// On match, returns the set with that single entry removed (order of
    /// the rest preserved); on no match, returns `None`. The caller must
    /// persist the returned set for the consumption to take effect, so a
    /// given code can never match twice.
    #[must_use]
    pub fn consume(&self, submitted: &str) -> Option<Self> {
        let submitted = submitted.trim();
        if submitted.is_empty() {
            return None;
        }

        let idx = self
            .hashes
            .iter()
            .position(|hash| verify_opaque_secret(submitted, hash))?;

        let mut remaining = self.hashes.clone();
        remaining.remove(idx);
        Some(Self { hashes: remaining })
    }

    /// Number of unused codes left
    pub fn remaining(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}
