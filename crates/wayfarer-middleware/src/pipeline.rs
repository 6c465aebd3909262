//! Fixed-order shaping pipeline.
//!
//! Every request flows through the same stages in the same order before
//! routing and dispatch:
//!
//! 1. **Rate limit** - fixed-window counter per client key
//! 2. **Body bound** - reject oversized collected bodies
//! 3. **Operator sanitize** - strip query-operator keys from JSON bodies
//! 4. **Markup sanitize** - neutralize embedded markup in JSON strings
//! 5. **Parameter dedup** - collapse repeated query parameters
//!
//! Security headers are not a stage: they are applied at egress by the
//! application, after the error sink, so that rejected and failed
//! requests carry them too.
//!
//! The order is fixed at construction; callers cannot reorder or
//! disable stages between builds of the same pipeline.

use std::sync::Arc;

use wayfarer_core::{AppError, BoxFuture, RequestContext};

use crate::middleware::{Middleware, Next};
use crate::types::{Request, Response};

/// A type-erased shaping stage.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// Marker for the fixed stage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    /// Stage 1: per-client fixed-window rate limiting.
    RateLimit = 1,
    /// Stage 2: collected-body size bound.
    BodyBound = 2,
    /// Stage 3: query-operator key removal.
    OperatorSanitize = 3,
    /// Stage 4: markup neutralization in JSON strings.
    MarkupSanitize = 4,
    /// Stage 5: repeated query parameter collapse.
    ParameterDedup = 5,
}

impl Stage {
    /// Returns the stage name used in log lines.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RateLimit => "rate_limit",
            Self::BodyBound => "body_bound",
            Self::OperatorSanitize => "operator_sanitize",
            Self::MarkupSanitize => "markup_sanitize",
            Self::ParameterDedup => "parameter_dedup",
        }
    }

    /// Returns all stages in pipeline order.
    #[must_use]
    pub const fn all() -> [Stage; 5] {
        [
            Self::RateLimit,
            Self::BodyBound,
            Self::OperatorSanitize,
            Self::MarkupSanitize,
            Self::ParameterDedup,
        ]
    }
}

/// The immutable shaping pipeline.
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
}

impl Pipeline {
    /// Creates a pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Runs a request through every stage, then the dispatch closure.
    ///
    /// A stage error aborts the chain; the caller is responsible for
    /// rendering it exactly once.
    pub async fn process<H>(
        &self,
        ctx: &mut RequestContext,
        request: Request,
        handler: H,
    ) -> Result<Response, AppError>
    where
        H: FnOnce(&mut RequestContext, Request) -> BoxFuture<'static, Result<Response, AppError>>
            + Send
            + 'static,
    {
        let mut next = Next::handler(handler);
        for middleware in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next.run(ctx, request).await
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|mw| mw.name()).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage. Stages run in the order they are added.
    #[must_use]
    pub fn stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Builds the pipeline. The stage order is fixed from here on.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
        }
    }
}
