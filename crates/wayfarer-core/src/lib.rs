//! # Wayfarer Core
//!
//! Core types for the Wayfarer booking API backend: the application error
//! model, the failure classifier, principals and roles, and the
//! per-request context.
//!
//! Every other Wayfarer crate speaks the vocabulary defined here. The
//! error model in particular is the contract the whole request pipeline
//! is built around: any failure that crosses a component boundary is an
//! [`AppError`] long before it reaches the response renderer.

#![doc(html_root_url = "https://docs.rs/wayfarer-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod classify;
pub mod context;
pub mod env;
pub mod error;
pub mod principal;

pub use classify::{classify_credential, classify_store, CredentialFailure, StoreFailure};
pub use context::{RequestContext, RequestId};
pub use env::Environment;
pub use error::{AppError, AppResult};
pub use principal::{Principal, Role};

use std::future::Future;
use std::pin::Pin;

/// A boxed future, used at trait-object seams throughout Wayfarer.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
