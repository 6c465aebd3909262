//! Response rendering.
//!
//! Success bodies are `{"status": "success", "data": ...}`; error
//! bodies derive from the [`AppError`] and the configured
//! [`Environment`]:
//!
//! - **Development**: full diagnostics, meaning the message, the debug
//!   representation, and the source chain.
//! - **Production**: operational errors render their message verbatim;
//!   non-operational errors are masked behind a fixed generic body, and
//!   the real failure is logged exactly once.
//!
//! Rendering is infallible: a failure to serialize would itself be a
//! defect, and the bodies here are built from plain strings.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, RETRY_AFTER};
use http::{HeaderValue, StatusCode};
use http_body_util::Full;
use serde_json::json;

use wayfarer_core::{error::GENERIC_ERROR_MESSAGE, AppError, Environment, RequestContext};
use wayfarer_middleware::Response;

/// Builds a `{"status": "success", "data": ...}` response.
#[must_use]
pub fn json_success(status: StatusCode, data: serde_json::Value) -> Response {
    let body = json!({ "status": "success", "data": data });
    json_response(status, &body)
}

fn json_response(status: StatusCode, body: &serde_json::Value) -> Response {
    // Serializing a Value cannot fail.
    let bytes = serde_json::to_vec(body).unwrap_or_default();
    let mut response = http::Response::new(Full::new(Bytes::from(bytes)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Renders [`AppError`] values into client responses.
#[derive(Debug, Clone, Copy)]
pub struct ErrorRenderer {
    environment: Environment,
}

impl ErrorRenderer {
    /// Creates a renderer for the given environment.
    #[must_use]
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }

    /// Renders an error. The only place in the pipeline that turns an
    /// [`AppError`] into a body.
    #[must_use]
    pub fn render(&self, ctx: &RequestContext, err: &AppError) -> Response {
        let mut response = match self.environment {
            Environment::Development => self.render_verbose(err),
            Environment::Production => self.render_restrained(ctx, err),
        };
        if let AppError::RateLimited {
            retry_after_seconds,
            ..
        } = err
        {
            if let Ok(value) = HeaderValue::from_str(&retry_after_seconds.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }
        response
    }

    fn render_verbose(&self, err: &AppError) -> Response {
        let body = json!({
            "status": err.status(),
            "message": err.message(),
            "error": format!("{err:?}"),
            "stack": source_chain(err),
        });
        json_response(err.status_code(), &body)
    }

    fn render_restrained(&self, ctx: &RequestContext, err: &AppError) -> Response {
        if err.is_operational() {
            let body = json!({ "status": err.status(), "message": err.message() });
            return json_response(err.status_code(), &body);
        }
        // The one diagnostic record for a masked failure.
        tracing::error!(
            request_id = %ctx.request_id,
            error = ?err,
            "unexpected failure"
        );
        let body = json!({ "status": "error", "message": GENERIC_ERROR_MESSAGE });
        json_response(StatusCode::INTERNAL_SERVER_ERROR, &body)
    }
}

fn source_chain(err: &AppError) -> Vec<String> {
    let mut chain = Vec::new();
    let mut current: Option<&(dyn std::error::Error + 'static)> = std::error::Error::source(err);
    while let Some(source) = current {
        chain.push(source.to_string());
        current = source.source();
    }
    chain
}
