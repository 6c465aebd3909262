//! Core middleware trait and chain types.
//!
//! Every shaping stage implements [`Middleware`]. A stage may rewrite
//! the request before calling [`Next::run`], decorate the response it
//! gets back, or short-circuit with an [`AppError`]; errors propagate
//! unrendered so the single terminal sink is the only place a failure
//! becomes a response body.
//!
//! # Example
//!
//! ```ignore
//! struct Timing;
//!
//! impl Middleware for Timing {
//!     fn name(&self) -> &'static str {
//!         "timing"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut RequestContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, Result<Response, AppError>> {
//!         Box::pin(async move {
//!             let start = std::time::Instant::now();
//!             let response = next.run(ctx, request).await;
//!             tracing::debug!(elapsed = ?start.elapsed(), "request timed");
//!             response
//!         })
//!     }
//! }
//! ```

use wayfarer_core::{AppError, BoxFuture, RequestContext};

use crate::types::{Request, Response};

/// A request shaping stage.
///
/// # Invariants
///
/// - A stage calls `next.run()` exactly once, unless it short-circuits
///   with an error.
/// - A stage never suppresses a downstream error.
/// - A stage never renders an error body; it returns the [`AppError`].
pub trait Middleware: Send + Sync + 'static {
    /// Returns the unique name of this stage, used in log lines.
    fn name(&self) -> &'static str;

    /// Processes the request through this stage.
    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<Response, AppError>>;
}

/// The remainder of the chain after the current stage.
///
/// Consumed by [`Next::run`] so it cannot be invoked twice.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    Handler(
        Box<
            dyn FnOnce(&mut RequestContext, Request) -> BoxFuture<'static, Result<Response, AppError>>
                + Send
                + 'a,
        >,
    ),
}

impl<'a> Next<'a> {
    /// Creates a `Next` that will invoke the given stage.
    pub(crate) fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates the terminal `Next` that invokes the dispatch closure.
    pub(crate) fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut RequestContext, Request) -> BoxFuture<'static, Result<Response, AppError>>
            + Send
            + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Invokes the next stage or the terminal dispatch.
    pub async fn run(
        self,
        ctx: &mut RequestContext,
        request: Request,
    ) -> Result<Response, AppError> {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.process(ctx, request, *next).await,
            NextInner::Handler(handler) => handler(ctx, request).await,
        }
    }
}
