//! # Wayfarer Auth
//!
//! Credential handling for the Wayfarer booking API: a signed bearer
//! token format, the principal store abstraction, and the gate that
//! turns a raw `Authorization` header into an authenticated, authorized
//! principal.
//!
//! The gate is a small state machine: a request is *unauthenticated*
//! until its credential verifies and its principal resolves, and only an
//! authenticated principal can be checked against a route's role list.
//! There is no path from "no principal" to "authorized": a missing or
//! bad credential on a protected route is always a 401, never a 403.

#![doc(html_root_url = "https://docs.rs/wayfarer-auth/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod gate;
pub mod store;
pub mod token;

pub use gate::{authorize, AuthGate};
pub use store::{MemoryPrincipalStore, PrincipalStore};
pub use token::{Claims, TokenSigner};
