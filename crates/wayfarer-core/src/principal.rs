//! Principals and roles.
//!
//! A [`Principal`] is the authenticated caller attached to a request
//! after the gate has verified its credential. Roles form a closed set;
//! authorization decisions compare against explicit role lists rather
//! than any implied hierarchy.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The closed set of caller roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Regular customer.
    User,
    /// Tour guide.
    Guide,
    /// Lead tour guide.
    LeadGuide,
    /// Administrator.
    Admin,
}

impl Role {
    /// Returns the wire name of this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Guide => "guide",
            Self::LeadGuide => "lead-guide",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "guide" => Ok(Self::Guide),
            "lead-guide" => Ok(Self::LeadGuide),
            "admin" => Ok(Self::Admin),
            other => Err(ParseRoleError(other.to_owned())),
        }
    }
}

/// An authenticated caller.
///
/// Built by the principal store at authentication time and attached to
/// the request context; handlers never see raw credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Stable subject identifier.
    pub id: String,
    /// The caller's role.
    pub role: Role,
    /// When the caller's credentials were last changed. Tokens issued
    /// before this instant are treated as revoked.
    pub credentials_changed_at: Option<DateTime<Utc>>,
}

impl Principal {
    /// Creates a principal with no recorded credential change.
    #[must_use]
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            credentials_changed_at: None,
        }
    }

    /// Sets the credential-change instant.
    #[must_use]
    pub fn with_credentials_changed_at(mut self, at: DateTime<Utc>) -> Self {
        self.credentials_changed_at = Some(at);
        self
    }

    /// Returns whether a token issued at `issued_at` (seconds since the
    /// Unix epoch) predates the last credential change.
    #[must_use]
    pub fn issued_before_credential_change(&self, issued_at: i64) -> bool {
        self.credentials_changed_at
            .is_some_and(|changed| issued_at < changed.timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn role_wire_names_round_trip() {
        for role in [Role::User, Role::Guide, Role::LeadGuide, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
    }

    #[test]
    fn role_serde_uses_kebab_case() {
        assert_eq!(
            serde_json::to_string(&Role::LeadGuide).unwrap(),
            "\"lead-guide\""
        );
        assert_eq!(
            serde_json::from_str::<Role>("\"admin\"").unwrap(),
            Role::Admin
        );
    }

    #[test]
    fn unknown_role_fails_to_parse() {
        assert!("superuser".parse::<Role>().is_err());
        assert!("Admin".parse::<Role>().is_err());
    }

    #[test]
    fn token_predating_credential_change_is_stale() {
        let changed = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let principal =
            Principal::new("u1", Role::User).with_credentials_changed_at(changed);
        assert!(principal.issued_before_credential_change(changed.timestamp() - 1));
        assert!(!principal.issued_before_credential_change(changed.timestamp()));
        assert!(!principal.issued_before_credential_change(changed.timestamp() + 10));
    }

    #[test]
    fn no_recorded_change_means_never_stale() {
        let principal = Principal::new("u1", Role::User);
        assert!(!principal.issued_before_credential_change(0));
    }
}
