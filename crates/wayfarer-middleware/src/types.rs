//! HTTP request and response types used by the pipeline.
//!
//! Bodies are fully collected before the pipeline runs, so stages see a
//! [`bytes::Bytes`] body they can inspect and rewrite without touching
//! the streaming machinery.

use std::net::SocketAddr;

use bytes::Bytes;
use http_body_util::Full;

/// An incoming request with its body already collected.
pub type Request = http::Request<Bytes>;

/// An outgoing response.
pub type Response = http::Response<Full<Bytes>>;

/// The peer address of the connection, inserted into request extensions
/// at accept time. Used as the rate-limit key when no proxy header is
/// present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientAddr(pub SocketAddr);

/// Replaces a request query in place, dropping the `?` when the new
/// query is empty.
pub(crate) fn rewrite_query(request: &mut Request, query: &str) {
    let path = request.uri().path().to_owned();
    let path_and_query = if query.is_empty() {
        path
    } else {
        format!("{path}?{query}")
    };
    let mut parts = request.uri().clone().into_parts();
    if let Ok(pq) = path_and_query.parse() {
        parts.path_and_query = Some(pq);
        if let Ok(uri) = http::Uri::from_parts(parts) {
            *request.uri_mut() = uri;
        }
    }
}

/// Replaces a request body, keeping `Content-Length` consistent.
pub(crate) fn replace_body(request: &mut Request, body: Bytes) {
    if let Ok(len) = http::HeaderValue::from_str(&body.len().to_string()) {
        request
            .headers_mut()
            .insert(http::header::CONTENT_LENGTH, len);
    }
    *request.body_mut() = body;
}
