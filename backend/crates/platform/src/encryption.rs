//! Field-Level Encryption for PII at Rest
//!
//! [`FieldCipher`] encrypts individual string attributes (phone numbers,
//! addresses, license identifiers) before they reach storage and decrypts
//! them after they leave it. The cipher is ChaCha20-Poly1305 with a random
//! per-value nonce; ciphertexts are stored as base64(nonce || ciphertext).
//!
//! ## Security
//! - Key material is process-wide configuration, loaded once at startup
//! - The key is zeroized on drop and never appears in Debug output or logs
//! - Absent values stay absent: encrypting `None` is a no-op, not an error

use base64::{Engine, engine::general_purpose};
use chacha20poly1305::aead::Aead;
use chacha20poly1305::{ChaCha20Poly1305, Key, KeyInit, Nonce};
use rand::{RngCore, rngs::OsRng};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Key length in bytes (ChaCha20-Poly1305)
pub const FIELD_KEY_LENGTH: usize = 32;

/// Nonce length in bytes, prefixed to each stored ciphertext
const NONCE_LENGTH: usize = 12;

/// Field encryption errors
#[derive(Debug, Error)]
pub enum FieldCipherError {
    /// Key material has the wrong length or encoding
    #[error("Field encryption key must be {FIELD_KEY_LENGTH} bytes")]
    InvalidKey,

    /// Stored value is not valid base64 or is too short to hold a nonce
    #[error("Stored ciphertext is malformed")]
    MalformedCiphertext,

    /// AEAD encryption failed
    #[error("Encryption failed")]
    EncryptionFailed,

    /// Authentication failed (tampered data or wrong key)
    #[error("Decryption failed")]
    DecryptionFailed,

    /// Decrypted bytes were not valid UTF-8
    #[error("Decrypted value is not valid UTF-8")]
    InvalidPlaintext,
}

/// Symmetric cipher key, zeroized on drop
#[derive(Zeroize, ZeroizeOnDrop)]
struct FieldKey([u8; FIELD_KEY_LENGTH]);

/// Symmetric encrypt/decrypt of individual string attributes
///
/// Designed to be shared across request handlers (`Clone` is cheap to avoid:
/// wrap in `Arc` instead); all methods take `&self` and hold no mutable state.
pub struct FieldCipher {
    key: FieldKey,
}

impl FieldCipher {
    /// Create a cipher from raw key bytes
    pub fn new(key: &[u8]) -> Result<Self, FieldCipherError> {
        let key: [u8; FIELD_KEY_LENGTH] =
            key.try_into().map_err(|_| FieldCipherError::InvalidKey)?;
        Ok(Self {
            key: FieldKey(key),
        })
    }

    /// Create a cipher from a base64-encoded key (deployment configuration)
    pub fn from_base64_key(encoded: &str) -> Result<Self, FieldCipherError> {
        let bytes = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|_| FieldCipherError::InvalidKey)?;
        Self::new(&bytes)
    }

    /// Create a cipher with a random key (development / tests)
    pub fn with_random_key() -> Self {
        let mut key = [0u8; FIELD_KEY_LENGTH];
        OsRng.fill_bytes(&mut key);
        Self {
            key: FieldKey(key),
        }
    }

    /// Encrypt a single attribute value
    ///
    /// Every call produces a distinct ciphertext for the same plaintext
    /// (random nonce), so ciphertexts are not comparable for equality.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, FieldCipherError> {
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key.0));

        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| FieldCipherError::EncryptionFailed)?;

        let mut combined = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);

        Ok(general_purpose::STANDARD.encode(combined))
    }

    /// Decrypt a single attribute value
    pub fn decrypt(&self, stored: &str) -> Result<String, FieldCipherError> {
        let combined = general_purpose::STANDARD
            .decode(stored)
            .map_err(|_| FieldCipherError::MalformedCiphertext)?;

        if combined.len() < NONCE_LENGTH {
            return Err(FieldCipherError::MalformedCiphertext);
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LENGTH);
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key.0));

        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| FieldCipherError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| FieldCipherError::InvalidPlaintext)
    }

    /// Encrypt an optional attribute; absence passes through unchanged
    pub fn encrypt_optional(
        &self,
        plaintext: Option<&str>,
    ) -> Result<Option<String>, FieldCipherError> {
        plaintext.map(|p| self.encrypt(p)).transpose()
    }

    /// Decrypt an optional attribute; absence passes through unchanged
    pub fn decrypt_optional(
        &self,
        stored: Option<&str>,
    ) -> Result<Option<String>, FieldCipherError> {
        stored.map(|s| self.decrypt(s)).transpose()
    }
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}
