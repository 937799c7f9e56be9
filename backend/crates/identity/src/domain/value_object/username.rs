//! Username Value Object
//!
//! ユーザー名は、ログインと表示に使用される公開ハンドル。
//! メールアドレスと並ぶもう一つのログイン識別子として扱う。
//!
//! ## 不変条件
//! - 長さ: 3〜60文字（正規化後）
//! - ASCII英数字と `_` `.` `-` のみ
//! - `@` を含まない（メールアドレスとの識別子解決が曖昧になるため）
//! - canonical（正規形）は小文字、NFKC正規化後に導出

use kernel::error::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use unicode_normalization::UnicodeNormalization;

/// Minimum length for a username (in characters)
pub const USERNAME_MIN_LENGTH: usize = 3;

/// Maximum length for a username (in characters)
pub const USERNAME_MAX_LENGTH: usize = 60;

/// Allowed special characters in a username
const ALLOWED_SPECIAL_CHARS: &[char] = &['_', '.', '-'];

/// Username value object
///
/// Keeps the original casing for display and a lowercase canonical form
/// for uniqueness checks and lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Username {
    original: String,
    canonical: String,
}

impl Username {
    /// Create a new username with validation
    pub fn new(raw: impl Into<String>) -> AppResult<Self> {
        let normalized: String = raw.into().nfkc().collect();
        let trimmed = normalized.trim();

        let char_count = trimmed.chars().count();
        if char_count < USERNAME_MIN_LENGTH {
            return Err(AppError::bad_request(format!(
                "Username must be at least {} characters",
                USERNAME_MIN_LENGTH
            )));
        }
        if char_count > USERNAME_MAX_LENGTH {
            return Err(AppError::bad_request(format!(
                "Username must be at most {} characters",
                USERNAME_MAX_LENGTH
            )));
        }

        for ch in trimmed.chars() {
            if !ch.is_ascii_alphanumeric() && !ALLOWED_SPECIAL_CHARS.contains(&ch) {
                return Err(AppError::bad_request(
                    "Username may only contain letters, digits, '_', '.' and '-'",
                ));
            }
        }

        // Must contain at least one alphanumeric character
        if !trimmed.chars().any(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::bad_request(
                "Username must contain at least one letter or digit",
            ));
        }

        Ok(Self {
            original: trimmed.to_string(),
            canonical: trimmed.to_lowercase(),
        })
    }

    /// Derive a username from an email's local part (federated provisioning)
    ///
    /// Strips disallowed characters; falls back to "user" when nothing
    /// usable remains. Uniqueness is the caller's concern.
    pub fn from_email_local_part(email: &str) -> Self {
        let base: String = email
            .split('@')
            .next()
            .unwrap_or("")
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || ALLOWED_SPECIAL_CHARS.contains(c))
            .collect();

        let base = if base.chars().count() < USERNAME_MIN_LENGTH {
            "user".to_string()
        } else {
            base
        };

        Self {
            canonical: base.to_lowercase(),
            original: base,
        }
    }

    /// Append a numeric suffix (collision resolution during provisioning)
    pub fn with_suffix(&self, n: u32) -> Self {
        let original = format!("{}{}", self.original, n);
        Self {
            canonical: original.to_lowercase(),
            original,
        }
    }

    /// Create from database values (assumed already validated)
    pub fn from_db(original: impl Into<String>) -> Self {
        let original = original.into();
        Self {
            canonical: original.to_lowercase(),
            original,
        }
    }

    /// Original casing, for display
    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// Lowercase canonical form, for lookups and uniqueness
    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}
