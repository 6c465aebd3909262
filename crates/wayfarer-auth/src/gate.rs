//! The authentication and authorization gate.
//!
//! [`AuthGate::authenticate`] walks a request from bearer-header
//! extraction through signature verification, principal resolution, and
//! revocation, producing either a live [`Principal`] or the precise 401
//! the caller should see. [`authorize`] is the separate, synchronous
//! role check; it fails closed with a 401 when no principal is present
//! so a misconfigured route can never leak a 403 to an anonymous caller.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use wayfarer_core::{classify_credential, AppError, Principal, Role};

use crate::store::PrincipalStore;
use crate::token::TokenSigner;

/// Message for requests with no usable bearer credential.
pub const NOT_LOGGED_IN_MESSAGE: &str = "You are not logged in! Please log in to get access.";

/// Message for tokens whose principal no longer exists.
pub const PRINCIPAL_GONE_MESSAGE: &str = "The user belonging to this token no longer exists.";

/// Message for tokens issued before the last credential change.
pub const CREDENTIAL_REVOKED_MESSAGE: &str =
    "User recently changed password! Please log in again.";

/// Message for authenticated callers whose role is not permitted.
pub const FORBIDDEN_MESSAGE: &str = "You do not have permission to perform this action";

/// Verifies credentials and resolves principals for protected routes.
#[derive(Clone)]
pub struct AuthGate {
    signer: TokenSigner,
    store: Arc<dyn PrincipalStore>,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate").finish_non_exhaustive()
    }
}

impl AuthGate {
    /// Creates a gate over a signer and a principal store.
    #[must_use]
    pub fn new(signer: TokenSigner, store: Arc<dyn PrincipalStore>) -> Self {
        Self { signer, store }
    }

    /// Authenticates a request from its `Authorization` header value.
    ///
    /// The full sequence, each step failing with its own 401:
    ///
    /// 1. a `Bearer` credential must be present,
    /// 2. its signature and expiry must verify,
    /// 3. its subject must resolve to a live principal,
    /// 4. it must not predate the principal's last credential change.
    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<Principal, AppError> {
        self.authenticate_at(authorization, Utc::now()).await
    }

    /// Authenticates against an explicit clock instant.
    pub async fn authenticate_at(
        &self,
        authorization: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Principal, AppError> {
        let token = extract_bearer(authorization)
            .ok_or_else(|| AppError::unauthenticated(NOT_LOGGED_IN_MESSAGE))?;

        let claims = self
            .signer
            .verify_at(token, now)
            .map_err(classify_credential)?;

        let principal = self
            .store
            .find_principal(&claims.sub)
            .await?
            .ok_or_else(|| AppError::unauthenticated(PRINCIPAL_GONE_MESSAGE))?;

        if principal.issued_before_credential_change(claims.iat) {
            return Err(AppError::unauthenticated(CREDENTIAL_REVOKED_MESSAGE));
        }

        Ok(principal)
    }
}

/// Checks an (optional) authenticated principal against a route's
/// allowed roles.
///
/// The store record is authoritative for the role, not the token
/// claims. A missing principal is a 401; a present principal with a
/// disallowed role is a 403.
pub fn authorize(principal: Option<&Principal>, allowed: &[Role]) -> Result<(), AppError> {
    let principal = principal.ok_or_else(|| AppError::unauthenticated(NOT_LOGGED_IN_MESSAGE))?;
    if allowed.contains(&principal.role) {
        Ok(())
    } else {
        tracing::debug!(
            principal = %principal.id,
            role = %principal.role,
            "role not permitted for this operation"
        );
        Err(AppError::forbidden(FORBIDDEN_MESSAGE))
    }
}

fn extract_bearer(authorization: Option<&str>) -> Option<&str> {
    let value = authorization?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
