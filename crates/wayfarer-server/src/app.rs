//! The pipeline orchestrator.
//!
//! [`App`] owns the whole request path: the fixed-order shaping
//! pipeline, the route table, the authorization gate, the handler
//! registry, and the response renderer. [`App::handle`] is the single
//! entry point and the **only** place an [`AppError`] becomes a
//! response body; stages, the gate, and handlers all just return the
//! error.
//!
//! Per route [`Access`], the gate runs before the handler: a protected
//! route authenticates, a restricted route additionally checks the
//! principal's role against the allow-list. The handler is looked up
//! and invoked exactly once, after the gate has passed.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use http::Method;

use wayfarer_auth::{authorize, AuthGate, MemoryPrincipalStore, PrincipalStore, TokenSigner};
use wayfarer_core::{AppError, BoxFuture, Environment, Principal, RequestContext};
use wayfarer_middleware::{
    BodyBoundStage, MarkupSanitizeStage, OperatorSanitizeStage, ParameterDedupStage, Pipeline,
    RateLimitStage, RateLimiterHandle, Request, Response, SecurityHeaders,
};

use crate::config::ServerConfig;
use crate::render::ErrorRenderer;
use crate::router::{Access, Router};

/// A boxed route handler.
pub type Handler = Arc<
    dyn Fn(RequestContext, Request) -> BoxFuture<'static, Result<Response, AppError>>
        + Send
        + Sync,
>;

struct Dispatcher {
    router: Router,
    handlers: HashMap<String, Handler>,
    gate: AuthGate,
}

impl Dispatcher {
    async fn run(
        self: Arc<Self>,
        mut ctx: RequestContext,
        mut request: Request,
    ) -> Result<Response, AppError> {
        let method = request.method().clone();
        let path = request.uri().path().to_owned();

        let Some(route) = self.router.match_route(&method, &path) else {
            let full_path = request
                .uri()
                .path_and_query()
                .map_or(path, |pq| pq.as_str().to_owned());
            return Err(AppError::not_found(full_path));
        };
        let (operation_id, access, params) = route.into_parts();

        match access {
            Access::Public => {}
            Access::Authenticated => {
                let principal = self.gate.authenticate(auth_header(&request)).await?;
                ctx.set_principal(principal);
            }
            Access::Restricted(roles) => {
                let principal = self.gate.authenticate(auth_header(&request)).await?;
                ctx.set_principal(principal);
                authorize(ctx.principal(), &roles)?;
            }
        }

        request.extensions_mut().insert(params);

        let handler = self
            .handlers
            .get(&operation_id)
            .cloned()
            .ok_or_else(|| AppError::internal(format!("no handler for {operation_id}")))?;
        handler(ctx, request).await
    }
}

fn auth_header(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// The assembled application.
pub struct App {
    pipeline: Pipeline,
    dispatcher: Arc<Dispatcher>,
    renderer: ErrorRenderer,
    security_headers: SecurityHeaders,
    environment: Environment,
    signer: TokenSigner,
    token_ttl: chrono::Duration,
    body_limit: usize,
}

impl App {
    /// Creates an application builder over a configuration.
    #[must_use]
    pub fn builder(config: ServerConfig) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// Handles one request end to end. Infallible: every failure is
    /// rendered here, exactly once.
    pub async fn handle(&self, request: Request) -> Response {
        let mut ctx = RequestContext::new();
        let method = request.method().clone();
        let uri = request.uri().clone();

        let dispatcher = Arc::clone(&self.dispatcher);
        let result = self
            .pipeline
            .process(&mut ctx, request, move |ctx, request| {
                // The dispatch future must be 'static, so it gets an
                // owned snapshot of the context.
                let snapshot = ctx.clone();
                Box::pin(dispatcher.run(snapshot, request))
            })
            .await;

        let mut response = match result {
            Ok(response) => response,
            Err(err) => self.renderer.render(&ctx, &err),
        };
        self.security_headers.apply(&mut response);

        if self.environment.is_development() {
            tracing::info!(
                request_id = %ctx.request_id,
                method = %method,
                uri = %uri,
                status = response.status().as_u16(),
                elapsed = ?ctx.received_at.elapsed(),
                "request"
            );
        }
        response
    }

    /// Renders an error outside the pipeline, with security headers.
    ///
    /// Used by the serve loop for failures that happen before a request
    /// can enter the pipeline (an over-long streamed body, for one).
    #[must_use]
    pub fn render_error(&self, err: &AppError) -> Response {
        let ctx = RequestContext::new();
        let mut response = self.renderer.render(&ctx, err);
        self.security_headers.apply(&mut response);
        response
    }

    /// Issues a bearer token for a principal, using the configured
    /// secret and lifetime.
    #[must_use]
    pub fn issue_token(&self, principal: &Principal) -> String {
        self.signer
            .sign(&principal.id, principal.role, self.token_ttl)
    }

    /// Returns the configured body bound in bytes.
    #[must_use]
    pub fn body_limit(&self) -> usize {
        self.body_limit
    }
}

/// Builder for [`App`].
pub struct AppBuilder {
    config: ServerConfig,
    router: Router,
    handlers: HashMap<String, Handler>,
    store: Option<Arc<dyn PrincipalStore>>,
}

impl AppBuilder {
    fn new(config: ServerConfig) -> Self {
        Self {
            config,
            router: Router::new(),
            handlers: HashMap::new(),
            store: None,
        }
    }

    /// Sets the principal store. Defaults to an empty in-memory store,
    /// which makes every protected route a 401.
    #[must_use]
    pub fn principal_store(mut self, store: Arc<dyn PrincipalStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Registers a route with its handler.
    #[must_use]
    pub fn route<F, Fut>(
        mut self,
        method: Method,
        pattern: &str,
        operation_id: &str,
        access: Access,
        handler: F,
    ) -> Self
    where
        F: Fn(RequestContext, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, AppError>> + Send + 'static,
    {
        self.router
            .add_route(method, pattern, operation_id, access);
        self.handlers.insert(
            operation_id.to_owned(),
            Arc::new(move |ctx, req| Box::pin(handler(ctx, req))),
        );
        self
    }

    /// Assembles the application: shaping stages in their fixed order,
    /// the gate, and the renderer.
    #[must_use]
    pub fn build(self) -> App {
        let signer = TokenSigner::new(self.config.token_secret().as_bytes().to_vec());
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryPrincipalStore::new()));
        let gate = AuthGate::new(signer.clone(), store);

        let limiter = RateLimiterHandle::new(self.config.rate_limit().clone());
        let pipeline = Pipeline::builder()
            .stage(RateLimitStage::new(limiter))
            .stage(BodyBoundStage::new(self.config.body_limit()))
            .stage(OperatorSanitizeStage::new())
            .stage(MarkupSanitizeStage::new())
            .stage(ParameterDedupStage::with_whitelist(
                self.config.param_whitelist().iter().cloned(),
            ))
            .build();

        App {
            pipeline,
            dispatcher: Arc::new(Dispatcher {
                router: self.router,
                handlers: self.handlers,
                gate,
            }),
            renderer: ErrorRenderer::new(self.config.environment()),
            security_headers: SecurityHeaders::new(),
            environment: self.config.environment(),
            signer,
            token_ttl: self.config.token_ttl(),
            body_limit: self.config.body_limit(),
        }
    }
}
