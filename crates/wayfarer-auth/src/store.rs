//! Principal resolution.
//!
//! The gate resolves a verified token subject to a live [`Principal`]
//! through this trait, so credential verification stays independent of
//! where account records actually live.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use wayfarer_core::{AppError, BoxFuture, Principal};

/// Resolves a token subject to the principal it names.
///
/// Returning `Ok(None)` means the principal no longer exists; the gate
/// turns that into a 401, not a 404, so a deleted account is
/// indistinguishable from a bad credential.
pub trait PrincipalStore: Send + Sync {
    /// Looks up a principal by its stable identifier.
    fn find_principal(&self, id: &str) -> BoxFuture<'_, Result<Option<Principal>, AppError>>;
}

/// In-memory principal store.
///
/// Backs the test suite and small deployments; a database-backed store
/// implements the same trait.
#[derive(Debug, Default)]
pub struct MemoryPrincipalStore {
    principals: RwLock<HashMap<String, Principal>>,
}

impl MemoryPrincipalStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a principal, keyed by its identifier.
    pub fn insert(&self, principal: Principal) {
        self.principals
            .write()
            .insert(principal.id.clone(), principal);
    }

    /// Removes a principal, returning whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        self.principals.write().remove(id).is_some()
    }
}

impl PrincipalStore for MemoryPrincipalStore {
    fn find_principal(&self, id: &str) -> BoxFuture<'_, Result<Option<Principal>, AppError>> {
        let found = self.principals.read().get(id).cloned();
        Box::pin(async move { Ok(found) })
    }
}

impl<S: PrincipalStore + ?Sized> PrincipalStore for Arc<S> {
    fn find_principal(&self, id: &str) -> BoxFuture<'_, Result<Option<Principal>, AppError>> {
        (**self).find_principal(id)
    }
}
