//! Collected-body size bound.
//!
//! The server already bounds the body while streaming it in; this stage
//! re-checks the collected length so the bound also holds for requests
//! injected directly into the pipeline (tests, in-process callers).

use wayfarer_core::{AppError, BoxFuture, RequestContext};

use crate::middleware::{Middleware, Next};
use crate::pipeline::Stage;
use crate::types::{Request, Response};

/// Rejects requests whose collected body exceeds the bound.
pub struct BodyBoundStage {
    limit: usize,
}

impl BodyBoundStage {
    /// Creates the stage with a bound in bytes.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }
}

impl Middleware for BodyBoundStage {
    fn name(&self) -> &'static str {
        Stage::BodyBound.name()
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<Response, AppError>> {
        Box::pin(async move {
            if request.body().len() > self.limit {
                tracing::warn!(
                    request_id = %ctx.request_id,
                    size = request.body().len(),
                    limit = self.limit,
                    "request body over bound"
                );
                return Err(AppError::payload_too_large(self.limit));
            }
            next.run(ctx, request).await
        })
    }
}
