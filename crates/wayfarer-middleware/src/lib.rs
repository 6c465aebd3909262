//! # Wayfarer Middleware
//!
//! The fixed-order request shaping pipeline for the Wayfarer booking
//! API. Every request is rate-limited, size-bounded, and sanitized in
//! the same stage order before it is routed; stages reject with a
//! structured error rather than rendering a response, so rendering
//! happens exactly once, in the application's terminal sink.

#![doc(html_root_url = "https://docs.rs/wayfarer-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod middleware;
pub mod pipeline;
pub mod stages;
pub mod types;

pub use middleware::{Middleware, Next};
pub use pipeline::{BoxedMiddleware, Pipeline, PipelineBuilder, Stage};
pub use stages::{
    BodyBoundStage, MarkupSanitizeStage, OperatorSanitizeStage, ParameterDedupStage,
    RateLimitConfig, RateLimitStage, RateLimiterHandle, SecurityHeaders,
};
pub use types::{ClientAddr, Request, Response};
