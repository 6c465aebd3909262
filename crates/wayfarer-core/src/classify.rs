//! Classification of raw collaborator failures into [`AppError`].
//!
//! The storage driver and the credential verifier each hand the pipeline
//! an opaque failure. Rather than duck-typing on error shapes at every
//! call site, each boundary is modeled as a closed tagged enum and
//! classified exactly once, here, by a pure total function.
//!
//! Classification never panics and never raises a secondary fault: when
//! a sub-detail cannot be extracted (for example the duplicated value
//! inside a driver message) the failure degrades to the non-operational
//! 500 branch instead of propagating the extraction error.

use crate::error::AppError;

/// A failure reported by the document-store driver boundary.
///
/// This is the closed set of driver failure shapes the pipeline
/// recognizes; anything else arrives as [`StoreFailure::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreFailure {
    /// A field value could not be cast to its schema type.
    CastError {
        /// The field that failed the cast.
        field: String,
        /// The raw value.
        value: String,
    },
    /// A unique-index violation. The duplicated value is embedded,
    /// quoted, somewhere in the driver message.
    DuplicateKey {
        /// The raw driver message.
        errmsg: String,
    },
    /// Schema validation produced one or more field-level messages.
    ValidationError {
        /// The field-level messages, in schema order.
        messages: Vec<String>,
    },
    /// Any driver failure the pipeline does not recognize.
    Unknown {
        /// The raw failure detail, kept for the diagnostic sink only.
        detail: String,
    },
}

/// A failure reported by the credential verifier boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialFailure {
    /// The token structure or encoding is not parseable.
    Malformed,
    /// The signature does not match.
    InvalidSignature,
    /// The token is past its expiry.
    Expired,
}

/// Classifies a storage-driver failure into an [`AppError`].
///
/// Total over [`StoreFailure`]; the duplicate-value extraction is
/// best-effort and falls back to the non-operational branch when the
/// driver message carries no quoted value.
#[must_use]
pub fn classify_store(failure: StoreFailure) -> AppError {
    match failure {
        StoreFailure::CastError { field, value } => AppError::invalid_field(field, value),
        StoreFailure::DuplicateKey { errmsg } => match extract_quoted(&errmsg) {
            Some(value) => AppError::duplicate_field(value),
            None => AppError::internal(format!(
                "duplicate key error without extractable value: {errmsg}"
            )),
        },
        StoreFailure::ValidationError { messages } => AppError::validation(messages),
        StoreFailure::Unknown { detail } => {
            AppError::internal(format!("unclassified storage failure: {detail}"))
        }
    }
}

/// Classifies a credential-verifier failure into an [`AppError`].
#[must_use]
pub const fn classify_credential(failure: CredentialFailure) -> AppError {
    match failure {
        CredentialFailure::Malformed | CredentialFailure::InvalidSignature => {
            AppError::InvalidCredential
        }
        CredentialFailure::Expired => AppError::ExpiredCredential,
    }
}

/// Extracts the first single- or double-quoted substring from a driver
/// message, quotes included.
///
/// The exact embedding of the duplicated value is storage-engine
/// coupled, so this is deliberately best-effort.
fn extract_quoted(errmsg: &str) -> Option<String> {
    let open = errmsg.find(['"', '\''])?;
    let quote = errmsg.as_bytes()[open] as char;
    let rest = &errmsg[open + 1..];
    let close = rest.find(quote)?;
    Some(format!("{quote}{}{quote}", &rest[..close]))
}
