//! The application error model.
//!
//! [`AppError`] is the single structured error type that crosses the
//! pipeline boundary. Every failure (storage driver errors, validation
//! errors, credential errors, unclassified faults) is normalized into
//! this shape before the response renderer sees it; no raw driver or
//! runtime error is ever serialized directly.
//!
//! Two attributes drive the rendering policy:
//!
//! - the HTTP status code, from which the wire `status` string is
//!   derived (`"fail"` for 4xx, `"error"` for 5xx), and
//! - the *operational* flag: operational errors are expected,
//!   client-attributable failures whose message is safe to disclose in
//!   any environment. Non-operational errors (the [`AppError::Internal`]
//!   variant) are masked in production.
//!
//! # Example
//!
//! ```
//! use wayfarer_core::AppError;
//!
//! let err = AppError::not_found("/api/v1/nope");
//! assert_eq!(err.status_code().as_u16(), 404);
//! assert_eq!(err.status(), "fail");
//! assert!(err.is_operational());
//! ```

use http::StatusCode;
use thiserror::Error;

/// Result type alias using [`AppError`].
pub type AppResult<T> = Result<T, AppError>;

/// Message rendered for invalid credentials.
pub const INVALID_CREDENTIAL_MESSAGE: &str = "Invalid token. Please log in again!";

/// Message rendered for expired credentials.
pub const EXPIRED_CREDENTIAL_MESSAGE: &str = "Your token has expired! Please log in again.";

/// Generic message rendered for masked non-operational errors.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong!";

/// Structured application error.
///
/// Immutable after construction; carries everything the renderer needs
/// to produce the client-facing body without consulting the original
/// failure again.
#[derive(Error, Debug)]
pub enum AppError {
    /// A field value could not be cast to its declared type
    /// (malformed identifier, wrong scalar type).
    #[error("Invalid {field}: {value}.")]
    InvalidField {
        /// The offending field name.
        field: String,
        /// The value that failed to cast.
        value: String,
    },

    /// A uniqueness constraint was violated on create/update.
    #[error("Duplicate field value: {value}. Please use another value!")]
    DuplicateField {
        /// The duplicated value, extracted from the driver message.
        value: String,
    },

    /// One or more schema validation failures.
    #[error("Invalid input data. {}", .messages.join(". "))]
    Validation {
        /// Field-level validation messages.
        messages: Vec<String>,
    },

    /// The identity credential is absent, malformed, or carries a bad
    /// signature.
    #[error("{INVALID_CREDENTIAL_MESSAGE}")]
    InvalidCredential,

    /// The identity credential is past its expiry.
    #[error("{EXPIRED_CREDENTIAL_MESSAGE}")]
    ExpiredCredential,

    /// Authentication failed for a reason other than the credential
    /// itself (principal gone, credential revoked by timestamp).
    #[error("{message}")]
    Unauthenticated {
        /// Client-safe explanation.
        message: String,
    },

    /// The principal is authenticated but its role is not permitted.
    #[error("{message}")]
    Forbidden {
        /// Client-safe explanation.
        message: String,
    },

    /// No route matched the request.
    #[error("Can't find {path} on this server!")]
    NotFound {
        /// The unmatched request path.
        path: String,
    },

    /// The request body exceeds the configured byte bound.
    #[error("Request body exceeds the {limit} byte limit!")]
    PayloadTooLarge {
        /// The configured bound in bytes.
        limit: usize,
    },

    /// The client exceeded its rate-limit window.
    #[error("{message}")]
    RateLimited {
        /// The configured client-facing message.
        message: String,
        /// Seconds until the window resets.
        retry_after_seconds: u64,
    },

    /// An unexpected, non-operational failure. The message is masked in
    /// production; the source is only ever logged.
    #[error("{message}")]
    Internal {
        /// Internal description of the failure.
        message: String,
        /// The underlying error, never exposed to clients.
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl AppError {
    /// Creates an error for a field that failed a type cast.
    #[must_use]
    pub fn invalid_field(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates a uniqueness-violation error naming the duplicate value.
    #[must_use]
    pub fn duplicate_field(value: impl Into<String>) -> Self {
        Self::DuplicateField {
            value: value.into(),
        }
    }

    /// Creates a validation error from field-level messages.
    #[must_use]
    pub fn validation<I>(messages: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::Validation {
            messages: messages.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates an authentication error with a client-safe message.
    #[must_use]
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }

    /// Creates an authorization error with a client-safe message.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a not-found error naming the unmatched path.
    #[must_use]
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates an oversized-payload error.
    #[must_use]
    pub fn payload_too_large(limit: usize) -> Self {
        Self::PayloadTooLarge { limit }
    }

    /// Creates a rate-limited error with the configured message.
    #[must_use]
    pub fn rate_limited(message: impl Into<String>, retry_after_seconds: u64) -> Self {
        Self::RateLimited {
            message: message.into(),
            retry_after_seconds,
        }
    }

    /// Creates a non-operational internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a non-operational internal error with a source.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidField { .. } | Self::DuplicateField { .. } | Self::Validation { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidCredential | Self::ExpiredCredential | Self::Unauthenticated { .. } => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the wire `status` string: `"fail"` for 4xx, `"error"`
    /// for 5xx.
    #[must_use]
    pub fn status(&self) -> &'static str {
        if self.status_code().is_client_error() {
            "fail"
        } else {
            "error"
        }
    }

    /// Returns whether this error's message is safe to disclose to a
    /// client in any environment.
    ///
    /// Only [`AppError::Internal`] is non-operational.
    #[must_use]
    pub const fn is_operational(&self) -> bool {
        !matches!(self, Self::Internal { .. })
    }

    /// Returns the client-facing message.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_field_formats_field_and_value() {
        let err = AppError::invalid_field("_id", "not-an-oid");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Invalid _id: not-an-oid.");
        assert!(err.is_operational());
    }

    #[test]
    fn duplicate_field_names_the_value() {
        let err = AppError::duplicate_field("\"The Forest Hiker\"");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.message().contains("The Forest Hiker"));
    }

    #[test]
    fn validation_concatenates_messages() {
        let err = AppError::validation(["name is required", "price must be positive"]);
        assert_eq!(
            err.message(),
            "Invalid input data. name is required. price must be positive"
        );
    }

    #[test]
    fn credential_errors_are_401_and_operational() {
        for err in [AppError::InvalidCredential, AppError::ExpiredCredential] {
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
            assert!(err.is_operational());
        }
        assert_eq!(
            AppError::InvalidCredential.message(),
            INVALID_CREDENTIAL_MESSAGE
        );
        assert_eq!(
            AppError::ExpiredCredential.message(),
            EXPIRED_CREDENTIAL_MESSAGE
        );
    }

    #[test]
    fn status_string_tracks_status_class() {
        assert_eq!(AppError::not_found("/x").status(), "fail");
        assert_eq!(AppError::forbidden("no").status(), "fail");
        assert_eq!(AppError::rate_limited("slow down", 60).status(), "fail");
        assert_eq!(AppError::internal("boom").status(), "error");
    }

    #[test]
    fn internal_is_non_operational() {
        let err = AppError::internal("unexpected driver shape");
        assert!(!err.is_operational());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn internal_with_source_keeps_the_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = AppError::internal_with_source("storage failure", io);
        let source = std::error::Error::source(&err);
        assert!(source.is_some());
    }

    #[test]
    fn not_found_names_the_path() {
        let err = AppError::not_found("/api/v1/nope");
        assert_eq!(err.message(), "Can't find /api/v1/nope on this server!");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn payload_too_large_is_413() {
        let err = AppError::payload_too_large(10_240);
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(err.message().contains("10240"));
    }

    #[test]
    fn rate_limited_carries_the_configured_message() {
        let err = AppError::rate_limited("Too many requests from this IP", 3600);
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.message(), "Too many requests from this IP");
    }
}
