//! Body sanitization stages.
//!
//! Two stages rewrite JSON request bodies in place:
//!
//! - [`OperatorSanitizeStage`] drops object keys that would be read as
//!   query operators by a document store: keys starting with `$` or
//!   containing `.`. Query parameters whose name smuggles an operator
//!   (`price[$gt]`, `a.b`) are dropped the same way.
//! - [`MarkupSanitizeStage`] neutralizes embedded markup in string
//!   values: `<script>` blocks are removed outright and remaining angle
//!   brackets are entity-escaped. Query parameter values are
//!   percent-decoded, neutralized the same way, and re-encoded, so a
//!   handler that decodes a value never receives live markup.
//!
//! Both stages are idempotent and leave non-JSON bodies untouched; a
//! body that fails to parse passes through unchanged for the handler to
//! reject on its own terms.

use bytes::Bytes;
use regex::Regex;
use serde_json::Value;

use wayfarer_core::{AppError, BoxFuture, RequestContext};

use crate::middleware::{Middleware, Next};
use crate::pipeline::Stage;
use crate::types::{replace_body, rewrite_query, Request, Response};

fn is_json(request: &Request) -> bool {
    request
        .headers()
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| {
            ct.trim_start()
                .to_ascii_lowercase()
                .starts_with("application/json")
        })
}

fn parse_json_body(request: &Request) -> Option<Value> {
    if !is_json(request) || request.body().is_empty() {
        return None;
    }
    serde_json::from_slice(request.body()).ok()
}

fn store_json_body(request: &mut Request, value: &Value) {
    // A Value always serializes.
    if let Ok(bytes) = serde_json::to_vec(value) {
        replace_body(request, Bytes::from(bytes));
    }
}

/// Drops store-operator keys from JSON bodies.
pub struct OperatorSanitizeStage;

impl OperatorSanitizeStage {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for OperatorSanitizeStage {
    fn default() -> Self {
        Self::new()
    }
}

fn is_operator_key(key: &str) -> bool {
    key.starts_with('$') || key.contains('.')
}

fn scrub_operators(value: &mut Value) -> bool {
    match value {
        Value::Object(map) => {
            let before = map.len();
            map.retain(|key, _| !is_operator_key(key));
            let mut changed = map.len() != before;
            for child in map.values_mut() {
                changed |= scrub_operators(child);
            }
            changed
        }
        Value::Array(items) => {
            let mut changed = false;
            for item in items {
                changed |= scrub_operators(item);
            }
            changed
        }
        _ => false,
    }
}

fn scrub_query(request: &mut Request) {
    let Some(query) = request.uri().query() else {
        return;
    };
    let kept: Vec<&str> = query
        .split('&')
        .filter(|segment| {
            let name = segment.split('=').next().unwrap_or(segment);
            !(name.contains('$') || name.contains('.'))
        })
        .collect();
    let cleaned = kept.join("&");
    if cleaned != query {
        rewrite_query(request, &cleaned);
    }
}

impl Middleware for OperatorSanitizeStage {
    fn name(&self) -> &'static str {
        Stage::OperatorSanitize.name()
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        mut request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<Response, AppError>> {
        Box::pin(async move {
            scrub_query(&mut request);
            if let Some(mut value) = parse_json_body(&request) {
                if scrub_operators(&mut value) {
                    tracing::debug!(
                        request_id = %ctx.request_id,
                        "removed operator keys from request body"
                    );
                    store_json_body(&mut request, &value);
                }
            }
            next.run(ctx, request).await
        })
    }
}

/// Neutralizes embedded markup in JSON string values and in
/// percent-decoded query parameter values.
pub struct MarkupSanitizeStage {
    script_block: Regex,
}

impl MarkupSanitizeStage {
    /// Creates the stage, compiling its pattern once.
    #[must_use]
    pub fn new() -> Self {
        Self {
            // The pattern is a literal; it always compiles.
            script_block: Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>")
                .expect("script pattern"),
        }
    }

    fn clean_string(&self, input: &str) -> String {
        let stripped = self.script_block.replace_all(input, "");
        stripped.replace('<', "&lt;").replace('>', "&gt;")
    }

    /// Neutralizes percent-decoded query values, re-encoding any that
    /// change. Untouched segments are carried verbatim.
    fn clean_query(&self, request: &mut Request) {
        let Some(query) = request.uri().query() else {
            return;
        };
        let mut changed = false;
        let rewritten: Vec<String> = query
            .split('&')
            .map(|segment| {
                let Some((name, value)) = segment.split_once('=') else {
                    return segment.to_owned();
                };
                let Ok(decoded) = urlencoding::decode(value) else {
                    return segment.to_owned();
                };
                let cleaned = self.clean_string(&decoded);
                if cleaned == decoded.as_ref() {
                    segment.to_owned()
                } else {
                    changed = true;
                    format!("{name}={}", urlencoding::encode(&cleaned))
                }
            })
            .collect();
        if changed {
            rewrite_query(request, &rewritten.join("&"));
        }
    }

    fn clean_value(&self, value: &mut Value) -> bool {
        match value {
            Value::String(s) => {
                let cleaned = self.clean_string(s);
                if cleaned == *s {
                    false
                } else {
                    *s = cleaned;
                    true
                }
            }
            Value::Object(map) => {
                let mut changed = false;
                for child in map.values_mut() {
                    changed |= self.clean_value(child);
                }
                changed
            }
            Value::Array(items) => {
                let mut changed = false;
                for item in items {
                    changed |= self.clean_value(item);
                }
                changed
            }
            _ => false,
        }
    }
}

impl Default for MarkupSanitizeStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for MarkupSanitizeStage {
    fn name(&self) -> &'static str {
        Stage::MarkupSanitize.name()
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        mut request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<Response, AppError>> {
        Box::pin(async move {
            self.clean_query(&mut request);
            if let Some(mut value) = parse_json_body(&request) {
                if self.clean_value(&mut value) {
                    tracing::debug!(
                        request_id = %ctx.request_id,
                        "neutralized markup in request body"
                    );
                    store_json_body(&mut request, &value);
                }
            }
            next.run(ctx, request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;
    use serde_json::json;

    fn json_request(body: &str) -> Request {
        http::Request::builder()
            .uri("/api/v1/tours")
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Bytes::from(body.to_owned()))
            .unwrap()
    }

    fn echo_handler() -> Next<'static> {
        Next::handler(|_ctx, req| {
            let body = req.body().clone();
            Box::pin(async move { Ok(http::Response::builder().body(Full::new(body)).unwrap()) })
        })
    }

    async fn run_stage<M: Middleware>(stage: &M, request: Request) -> Value {
        let mut ctx = RequestContext::new();
        let response = stage
            .process(&mut ctx, request, echo_handler())
            .await
            .unwrap();
        let frame = {
            use http_body_util::BodyExt;
            response.into_body().collect().await.unwrap().to_bytes()
        };
        serde_json::from_slice(&frame).unwrap()
    }

    #[tokio::test]
    async fn operator_keys_are_removed_recursively() {
        let stage = OperatorSanitizeStage::new();
        let body = run_stage(
            &stage,
            json_request(r#"{"email":{"$gt":""},"filter.path":1,"nested":{"$where":"x","ok":2}}"#),
        )
        .await;
        assert_eq!(body, json!({"email": {}, "nested": {"ok": 2}}));
    }

    #[tokio::test]
    async fn clean_body_passes_untouched() {
        let stage = OperatorSanitizeStage::new();
        let body = run_stage(&stage, json_request(r#"{"name":"Sea Explorer","price":497}"#)).await;
        assert_eq!(body, json!({"name": "Sea Explorer", "price": 497}));
    }

    #[tokio::test]
    async fn unparseable_json_passes_through_for_the_handler() {
        let stage = OperatorSanitizeStage::new();
        let mut ctx = RequestContext::new();
        let response = stage
            .process(&mut ctx, json_request("{not json"), echo_handler())
            .await
            .unwrap();
        use http_body_util::BodyExt;
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes.as_ref(), b"{not json");
    }

    #[tokio::test]
    async fn script_blocks_are_removed_and_brackets_escaped() {
        let stage = MarkupSanitizeStage::new();
        let body = run_stage(
            &stage,
            json_request(r#"{"name":"x<script>alert(1)</script>y","note":"a<b>c"}"#),
        )
        .await;
        assert_eq!(body, json!({"name": "xy", "note": "a&lt;b&gt;c"}));
    }

    #[tokio::test]
    async fn markup_sanitize_is_idempotent() {
        let stage = MarkupSanitizeStage::new();
        let once = run_stage(&stage, json_request(r#"{"note":"a<b>c"}"#)).await;
        let twice = run_stage(&stage, json_request(&once.to_string())).await;
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn non_json_bodies_are_ignored() {
        let stage = MarkupSanitizeStage::new();
        let mut ctx = RequestContext::new();
        let request = http::Request::builder()
            .uri("/x")
            .header(http::header::CONTENT_TYPE, "text/plain")
            .body(Bytes::from_static(b"<script>alert(1)</script>"))
            .unwrap();
        let response = stage
            .process(&mut ctx, request, echo_handler())
            .await
            .unwrap();
        use http_body_util::BodyExt;
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes.as_ref(), b"<script>alert(1)</script>");
    }

    #[tokio::test]
    async fn operator_query_parameters_are_dropped() {
        let stage = OperatorSanitizeStage::new();
        let mut ctx = RequestContext::new();
        let request: Request = http::Request::builder()
            .uri("/api/v1/tours?$where=1&sort=price&a.b=1")
            .body(Bytes::new())
            .unwrap();
        let next = Next::handler(|_ctx, req| {
            let query = req.uri().query().unwrap_or("").to_owned();
            Box::pin(async move {
                Ok(http::Response::builder()
                    .body(Full::new(Bytes::from(query)))
                    .unwrap())
            })
        });
        let response = stage.process(&mut ctx, request, next).await.unwrap();
        use http_body_util::BodyExt;
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes.as_ref(), b"sort=price");
    }

    #[tokio::test]
    async fn encoded_script_in_query_value_is_neutralized() {
        let stage = MarkupSanitizeStage::new();
        let mut ctx = RequestContext::new();
        let request: Request = http::Request::builder()
            .uri("/api/v1/tours?q=%3Cscript%3Ealert(1)%3C%2Fscript%3E&sort=price")
            .body(Bytes::new())
            .unwrap();
        let next = Next::handler(|_ctx, req| {
            let query = req.uri().query().unwrap_or("").to_owned();
            Box::pin(async move {
                Ok(http::Response::builder()
                    .body(Full::new(Bytes::from(query)))
                    .unwrap())
            })
        });
        let response = stage.process(&mut ctx, request, next).await.unwrap();
        use http_body_util::BodyExt;
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes.as_ref(), b"q=&sort=price");
    }

    #[tokio::test]
    async fn encoded_brackets_in_query_value_are_escaped() {
        let stage = MarkupSanitizeStage::new();
        let mut ctx = RequestContext::new();
        let request: Request = http::Request::builder()
            .uri("/t?note=a%3Cb%3Ec")
            .body(Bytes::new())
            .unwrap();
        let next = Next::handler(|_ctx, req| {
            let query = req.uri().query().unwrap_or("").to_owned();
            Box::pin(async move {
                Ok(http::Response::builder()
                    .body(Full::new(Bytes::from(query)))
                    .unwrap())
            })
        });
        let response = stage.process(&mut ctx, request, next).await.unwrap();
        use http_body_util::BodyExt;
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        // "a&lt;b&gt;c", percent-encoded: the decoded form carries no
        // live brackets.
        assert_eq!(bytes.as_ref(), b"note=a%26lt%3Bb%26gt%3Bc");
        let decoded = urlencoding::decode("a%26lt%3Bb%26gt%3Bc").unwrap();
        assert_eq!(decoded, "a&lt;b&gt;c");
    }

    #[test]
    fn operator_key_detection() {
        assert!(is_operator_key("$gt"));
        assert!(is_operator_key("a.b"));
        assert!(!is_operator_key("price"));
        assert!(!is_operator_key("dollar$"));
    }
}
