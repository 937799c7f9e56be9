//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (SHA-256, Base64, constant-time compare)
//! - Password hashing (Argon2id, NIST SP 800-63B compliant)
//! - Field-level encryption for PII at rest (ChaCha20-Poly1305)
//! - Client identification helpers for audit records

pub mod client;
pub mod crypto;
pub mod encryption;
pub mod password;
