//! Deployment environment.
//!
//! The environment is read once at startup, stored in the server
//! configuration, and threaded explicitly into the components whose
//! behavior depends on it (the error renderer and request logging).
//! Nothing below the configuration layer consults process environment
//! variables.

use std::fmt;
use std::str::FromStr;

/// Deployment environment, selecting the disclosure policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    /// Full diagnostics in error bodies, per-request logging.
    Development,
    /// Operational messages only; internal faults are masked.
    Production,
}

impl Environment {
    /// Returns whether this is the development environment.
    #[must_use]
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown environment name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown environment: {0}")]
pub struct ParseEnvironmentError(pub String);

impl FromStr for Environment {
    type Err = ParseEnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            other => Err(ParseEnvironmentError(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for env in [Environment::Development, Environment::Production] {
            assert_eq!(env.as_str().parse::<Environment>(), Ok(env));
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert!("staging".parse::<Environment>().is_err());
        assert!("PRODUCTION".parse::<Environment>().is_err());
    }

    #[test]
    fn only_development_is_development() {
        assert!(Environment::Development.is_development());
        assert!(!Environment::Production.is_development());
    }
}
