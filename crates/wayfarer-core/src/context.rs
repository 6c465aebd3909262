//! Per-request context.
//!
//! One [`RequestContext`] is created when a request enters the pipeline
//! and travels with it to the terminal handler. It carries the request
//! identifier used to correlate log lines and, once the gate has run,
//! the authenticated principal.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::principal::Principal;

/// Unique identifier assigned to each request at ingress.
///
/// Time-ordered (UUID v7) so identifiers sort by arrival when grepping
/// logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::generate()
    }
}

/// State that accompanies a request through the pipeline.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Identifier for log correlation.
    pub request_id: RequestId,
    /// When the request entered the pipeline.
    pub received_at: Instant,
    /// The authenticated caller, set by the gate on protected routes.
    /// `None` on public routes and before the gate has run.
    pub principal: Option<Principal>,
}

impl RequestContext {
    /// Creates a fresh context for an incoming request.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: RequestId::generate(),
            received_at: Instant::now(),
            principal: None,
        }
    }

    /// Attaches the authenticated principal.
    pub fn set_principal(&mut self, principal: Principal) {
        self.principal = Some(principal);
    }

    /// Returns the authenticated principal, if the gate has run.
    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
