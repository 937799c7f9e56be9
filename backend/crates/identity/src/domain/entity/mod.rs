//! Domain Entities

pub mod audit;
pub mod principal;

pub use audit::{AuditEvent, AuditEventKind};
pub use principal::{MfaEnrollment, Principal};
