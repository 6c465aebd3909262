//! Baseline security response headers.
//!
//! Applied at egress by the application, after the error sink, so every
//! response carries them: successes, shaped rejections, and rendered
//! errors alike. Existing values are not overwritten, letting a handler
//! tighten (or relax) an individual header for its own route.

use http::header::HeaderName;
use http::HeaderValue;

use crate::types::Response;

const HEADERS: [(&str, &str); 6] = [
    ("x-dns-prefetch-control", "off"),
    ("x-frame-options", "SAMEORIGIN"),
    (
        "strict-transport-security",
        "max-age=15552000; includeSubDomains",
    ),
    ("x-download-options", "noopen"),
    ("x-content-type-options", "nosniff"),
    ("x-xss-protection", "0"),
];

/// Baseline security header set.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityHeaders;

impl SecurityHeaders {
    /// Creates the default header set.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Adds each header that is not already present.
    pub fn apply(&self, response: &mut Response) {
        for (name, value) in HEADERS {
            let name = HeaderName::from_static(name);
            if !response.headers().contains_key(&name) {
                response
                    .headers_mut()
                    .insert(name, HeaderValue::from_static(value));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::Full;

    fn response() -> Response {
        http::Response::builder()
            .body(Full::new(Bytes::from_static(b"{}")))
            .unwrap()
    }

    #[test]
    fn all_baseline_headers_are_set() {
        let mut response = response();
        SecurityHeaders::new().apply(&mut response);
        for (name, value) in HEADERS {
            assert_eq!(response.headers()[name], value, "header: {name}");
        }
    }

    #[test]
    fn existing_values_are_not_overwritten() {
        let mut response = http::Response::builder()
            .header("x-frame-options", "DENY")
            .body(Full::new(Bytes::new()))
            .unwrap();
        SecurityHeaders::new().apply(&mut response);
        assert_eq!(response.headers()["x-frame-options"], "DENY");
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    }

    #[test]
    fn apply_is_idempotent() {
        let mut response = response();
        let headers = SecurityHeaders::new();
        headers.apply(&mut response);
        headers.apply(&mut response);
        assert_eq!(
            response.headers().get_all("x-frame-options").iter().count(),
            1
        );
    }
}
