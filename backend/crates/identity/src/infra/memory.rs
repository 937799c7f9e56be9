//! In-Memory Repository Implementation
//!
//! Store used by the use-case tests and for local development without a
//! database. Mirrors the semantics of the PostgreSQL implementation,
//! including the case-normalized lookups.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use crate::domain::entity::{AuditEvent, Principal};
use crate::domain::repository::{AuditSink, PrincipalRepository};
use crate::domain::value_object::{Email, PrincipalId, Username};
use crate::error::IdentityResult;

/// In-memory identity repository
#[derive(Clone, Default)]
pub struct InMemoryIdentityRepository {
    principals: Arc<Mutex<HashMap<Uuid, Principal>>>,
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryIdentityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn principals(&self) -> MutexGuard<'_, HashMap<Uuid, Principal>> {
        self.principals
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of the recorded audit events (test inspection)
    pub fn recorded_events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Direct read of a stored principal (test inspection)
    pub fn stored(&self, principal_id: &PrincipalId) -> Option<Principal> {
        self.principals().get(principal_id.as_uuid()).cloned()
    }
}

impl PrincipalRepository for InMemoryIdentityRepository {
    async fn create(&self, principal: &Principal) -> IdentityResult<()> {
        self.principals()
            .insert(*principal.principal_id.as_uuid(), principal.clone());
        Ok(())
    }

    async fn find_by_id(&self, principal_id: &PrincipalId) -> IdentityResult<Option<Principal>> {
        Ok(self.principals().get(principal_id.as_uuid()).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> IdentityResult<Option<Principal>> {
        Ok(self
            .principals()
            .values()
            .find(|p| p.email.as_str() == email.as_str())
            .cloned())
    }

    async fn find_by_username(&self, username: &Username) -> IdentityResult<Option<Principal>> {
        Ok(self
            .principals()
            .values()
            .find(|p| p.username.canonical() == username.canonical())
            .cloned())
    }

    async fn exists_by_email(&self, email: &Email) -> IdentityResult<bool> {
        Ok(self
            .principals()
            .values()
            .any(|p| p.email.as_str() == email.as_str()))
    }

    async fn exists_by_username(&self, username: &Username) -> IdentityResult<bool> {
        Ok(self
            .principals()
            .values()
            .any(|p| p.username.canonical() == username.canonical()))
    }

    async fn update(&self, principal: &Principal) -> IdentityResult<()> {
        self.principals()
            .insert(*principal.principal_id.as_uuid(), principal.clone());
        Ok(())
    }
}

impl AuditSink for InMemoryIdentityRepository {
    async fn record(&self, event: &AuditEvent) -> IdentityResult<()> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
        Ok(())
    }
}
