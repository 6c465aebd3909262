//! Fixed-window rate limiting.
//!
//! Each client key gets an atomic counter over a fixed window. The
//! first request in a window sets its start; once the configured
//! maximum is reached, further requests in the same window are rejected
//! with a 429 carrying the configured message and a `Retry-After`
//! header. The counter state is shared across connections through a
//! cloneable handle.
//!
//! The client key is the first address in `X-Forwarded-For`, then
//! `X-Real-IP`, then the connection peer address.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use wayfarer_core::{AppError, BoxFuture, RequestContext};

use crate::middleware::{Middleware, Next};
use crate::pipeline::Stage;
use crate::types::{ClientAddr, Request, Response};

/// Response header names attached by the limiter.
pub mod headers {
    /// Maximum requests per window.
    pub const LIMIT: &str = "x-ratelimit-limit";
    /// Requests remaining in the current window.
    pub const REMAINING: &str = "x-ratelimit-remaining";
    /// Seconds until the current window resets.
    pub const RESET: &str = "x-ratelimit-reset";
}

/// Default window capacity.
pub const DEFAULT_MAX_REQUESTS: u32 = 100;

/// Default window length: one hour.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(3600);

/// Default rejection message.
pub const DEFAULT_MESSAGE: &str = "Too many requests from this IP, please try again in an hour!";

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per key per window.
    pub max_requests: u32,
    /// Window length.
    pub window: Duration,
    /// Client-facing rejection message.
    pub message: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window: DEFAULT_WINDOW,
            message: DEFAULT_MESSAGE.to_owned(),
        }
    }
}

impl RateLimitConfig {
    /// Creates a config with the given capacity and window.
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            message: DEFAULT_MESSAGE.to_owned(),
        }
    }

    /// Sets the rejection message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started_at: Instant,
}

/// The outcome of consuming one request from a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Consume {
    Allowed { remaining: u32, reset_in: Duration },
    Denied { retry_after: Duration },
}

/// Shared fixed-window counter state.
///
/// Cheap to clone; all clones share one table.
#[derive(Clone)]
pub struct RateLimiterHandle {
    config: Arc<RateLimitConfig>,
    windows: Arc<Mutex<HashMap<String, Window>>>,
}

impl RateLimiterHandle {
    /// Creates a fresh limiter.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config: Arc::new(config),
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn consume(&self, key: &str, now: Instant) -> Consume {
        let mut windows = self.windows.lock();
        let window = windows.entry(key.to_owned()).or_insert(Window {
            count: 0,
            started_at: now,
        });

        let elapsed = now.duration_since(window.started_at);
        if elapsed >= self.config.window {
            window.count = 0;
            window.started_at = now;
        }

        let reset_in = self.config.window - now.duration_since(window.started_at);
        if window.count >= self.config.max_requests {
            return Consume::Denied {
                retry_after: reset_in,
            };
        }
        window.count += 1;
        Consume::Allowed {
            remaining: self.config.max_requests - window.count,
            reset_in,
        }
    }
}

/// The rate-limit pipeline stage.
pub struct RateLimitStage {
    limiter: RateLimiterHandle,
}

impl RateLimitStage {
    /// Creates the stage over a shared limiter handle.
    #[must_use]
    pub fn new(limiter: RateLimiterHandle) -> Self {
        Self { limiter }
    }
}

impl Middleware for RateLimitStage {
    fn name(&self) -> &'static str {
        Stage::RateLimit.name()
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<Response, AppError>> {
        Box::pin(async move {
            let key = client_key(&request);
            match self.limiter.consume(&key, Instant::now()) {
                Consume::Denied { retry_after } => {
                    tracing::warn!(
                        request_id = %ctx.request_id,
                        client = %key,
                        "rate limit exceeded"
                    );
                    Err(AppError::rate_limited(
                        self.limiter.config.message.clone(),
                        retry_after.as_secs(),
                    ))
                }
                Consume::Allowed {
                    remaining,
                    reset_in,
                } => {
                    let limit = self.limiter.config.max_requests;
                    let mut response = next.run(ctx, request).await?;
                    set_header(&mut response, headers::LIMIT, limit.to_string());
                    set_header(&mut response, headers::REMAINING, remaining.to_string());
                    set_header(&mut response, headers::RESET, reset_in.as_secs().to_string());
                    Ok(response)
                }
            }
        })
    }
}

fn set_header(response: &mut Response, name: &'static str, value: String) {
    if let Ok(value) = http::HeaderValue::from_str(&value) {
        response.headers_mut().insert(name, value);
    }
}

fn client_key(request: &Request) -> String {
    if let Some(forwarded) = header_str(request, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_owned();
            }
        }
    }
    if let Some(real_ip) = header_str(request, "x-real-ip") {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_owned();
        }
    }
    request
        .extensions()
        .get::<ClientAddr>()
        .map_or_else(|| "unknown".to_owned(), |addr| addr.0.ip().to_string())
}

fn header_str<'r>(request: &'r Request, name: &str) -> Option<&'r str> {
    request.headers().get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::Full;

    fn request_from(ip: &str) -> Request {
        http::Request::builder()
            .uri("/api/v1/tours")
            .header("x-forwarded-for", ip)
            .body(Bytes::new())
            .unwrap()
    }

    fn ok_handler() -> crate::middleware::Next<'static> {
        Next::handler(|_ctx, _req| {
            Box::pin(async {
                Ok(http::Response::builder()
                    .body(Full::new(Bytes::from_static(b"OK")))
                    .unwrap())
            })
        })
    }

    fn limiter(max: u32, window: Duration) -> RateLimiterHandle {
        RateLimiterHandle::new(RateLimitConfig::new(max, window))
    }

    #[test]
    fn window_allows_up_to_capacity_then_denies() {
        let limiter = limiter(2, Duration::from_secs(60));
        let start = Instant::now();
        assert!(matches!(
            limiter.consume("1.2.3.4", start),
            Consume::Allowed { remaining: 1, .. }
        ));
        assert!(matches!(
            limiter.consume("1.2.3.4", start),
            Consume::Allowed { remaining: 0, .. }
        ));
        assert!(matches!(
            limiter.consume("1.2.3.4", start),
            Consume::Denied { .. }
        ));
    }

    #[test]
    fn window_resets_after_it_elapses() {
        let limiter = limiter(1, Duration::from_secs(60));
        let start = Instant::now();
        assert!(matches!(
            limiter.consume("k", start),
            Consume::Allowed { .. }
        ));
        assert!(matches!(limiter.consume("k", start), Consume::Denied { .. }));
        let later = start + Duration::from_secs(61);
        assert!(matches!(
            limiter.consume("k", later),
            Consume::Allowed { .. }
        ));
    }

    #[test]
    fn keys_are_tracked_independently() {
        let limiter = limiter(1, Duration::from_secs(60));
        let now = Instant::now();
        assert!(matches!(limiter.consume("a", now), Consume::Allowed { .. }));
        assert!(matches!(limiter.consume("b", now), Consume::Allowed { .. }));
        assert!(matches!(limiter.consume("a", now), Consume::Denied { .. }));
    }

    #[test]
    fn client_key_prefers_forwarded_for_first_hop() {
        let request: Request = http::Request::builder()
            .uri("/")
            .header("x-forwarded-for", "9.9.9.9, 10.0.0.1")
            .header("x-real-ip", "8.8.8.8")
            .body(Bytes::new())
            .unwrap();
        assert_eq!(client_key(&request), "9.9.9.9");
    }

    #[test]
    fn client_key_falls_back_to_peer_address() {
        let mut request: Request = http::Request::builder()
            .uri("/")
            .body(Bytes::new())
            .unwrap();
        assert_eq!(client_key(&request), "unknown");
        request
            .extensions_mut()
            .insert(ClientAddr("7.7.7.7:5000".parse().unwrap()));
        assert_eq!(client_key(&request), "7.7.7.7");
    }

    #[tokio::test]
    async fn allowed_responses_carry_limit_headers() {
        let stage = RateLimitStage::new(limiter(5, Duration::from_secs(60)));
        let mut ctx = RequestContext::new();
        let next = ok_handler();
        let response = stage
            .process(&mut ctx, request_from("1.1.1.1"), next)
            .await
            .unwrap();
        assert_eq!(response.headers()[headers::LIMIT], "5");
        assert_eq!(response.headers()[headers::REMAINING], "4");
        assert!(response.headers().contains_key(headers::RESET));
    }

    #[tokio::test]
    async fn exhausted_window_yields_429_with_retry_seconds() {
        let stage = RateLimitStage::new(limiter(1, Duration::from_secs(60)));
        let mut ctx = RequestContext::new();
        stage
            .process(&mut ctx, request_from("2.2.2.2"), ok_handler())
            .await
            .unwrap();
        let err = stage
            .process(&mut ctx, request_from("2.2.2.2"), ok_handler())
            .await
            .unwrap_err();
        match err {
            AppError::RateLimited {
                message,
                retry_after_seconds,
            } => {
                assert_eq!(message, DEFAULT_MESSAGE);
                assert!(retry_after_seconds <= 60);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
