//! Request routing and access declaration.
//!
//! The router maps an incoming method + path to an operation ID and
//! that operation's declared access level. Access is part of the route
//! table, not the handler: a handler can never forget to gate itself,
//! because the orchestrator runs the gate from the [`Access`] value
//! before the handler is looked up.
//!
//! # Example
//!
//! ```rust
//! use wayfarer_server::{Access, Router};
//! use wayfarer_core::Role;
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.add_route(Method::GET, "/api/v1/tours", "listTours", Access::Public);
//! router.add_route(
//!     Method::POST,
//!     "/api/v1/tours",
//!     "createTour",
//!     Access::Restricted(vec![Role::Admin, Role::LeadGuide]),
//! );
//!
//! let m = router.match_route(&Method::GET, "/api/v1/tours").unwrap();
//! assert_eq!(m.operation_id(), "listTours");
//! ```

use std::collections::HashMap;

use http::Method;

use wayfarer_core::Role;

/// The access level a route declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// No credential required.
    Public,
    /// Any authenticated principal.
    Authenticated,
    /// Only principals whose role is in the list.
    Restricted(Vec<Role>),
}

/// Path parameters extracted from a matched route, carried in request
/// extensions for the handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(pub HashMap<String, String>);

impl PathParams {
    /// Returns a parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

/// A matched route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    operation_id: String,
    access: Access,
    params: HashMap<String, String>,
}

impl RouteMatch {
    /// Returns the operation ID.
    #[must_use]
    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    /// Returns the route's access level.
    #[must_use]
    pub fn access(&self) -> &Access {
        &self.access
    }

    /// Returns the extracted path parameters.
    #[must_use]
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// Returns a specific path parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Consumes the match, yielding its parts.
    #[must_use]
    pub fn into_parts(self) -> (String, Access, PathParams) {
        (self.operation_id, self.access, PathParams(self.params))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone)]
struct Route {
    method: Method,
    segments: Vec<PathSegment>,
    operation_id: String,
    access: Access,
}

impl Route {
    fn new(
        method: Method,
        pattern: &str,
        operation_id: impl Into<String>,
        access: Access,
    ) -> Self {
        Self {
            method,
            segments: parse_segments(pattern),
            operation_id: operation_id.into(),
            access,
        }
    }

    fn match_path(&self, path: &str) -> Option<HashMap<String, String>> {
        let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if path_segments.len() != self.segments.len() {
            return None;
        }
        let mut params = HashMap::new();
        for (pattern, actual) in self.segments.iter().zip(path_segments.iter()) {
            match pattern {
                PathSegment::Literal(expected) => {
                    if expected != *actual {
                        return None;
                    }
                }
                PathSegment::Param(name) => {
                    params.insert(name.clone(), (*actual).to_owned());
                }
            }
        }
        Some(params)
    }
}

fn parse_segments(pattern: &str) -> Vec<PathSegment> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s.starts_with('{') && s.ends_with('}') {
                PathSegment::Param(s[1..s.len() - 1].to_owned())
            } else {
                PathSegment::Literal(s.to_owned())
            }
        })
        .collect()
}

/// Route table. First match wins.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Registers a route.
    pub fn add_route(
        &mut self,
        method: Method,
        pattern: impl AsRef<str>,
        operation_id: impl Into<String>,
        access: Access,
    ) {
        self.routes
            .push(Route::new(method, pattern.as_ref(), operation_id, access));
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Matches a request to a route, extracting path parameters.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        for route in &self.routes {
            if route.method == *method {
                if let Some(params) = route.match_path(path) {
                    return Some(RouteMatch {
                        operation_id: route.operation_id.clone(),
                        access: route.access.clone(),
                        params,
                    });
                }
            }
        }
        None
    }

    /// Returns whether an operation ID is registered.
    #[must_use]
    pub fn has_operation(&self, operation_id: &str) -> bool {
        self.routes.iter().any(|r| r.operation_id == operation_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn natours_router() -> Router {
        let mut router = Router::new();
        router.add_route(Method::GET, "/api/v1/tours", "listTours", Access::Public);
        router.add_route(
            Method::POST,
            "/api/v1/tours",
            "createTour",
            Access::Restricted(vec![Role::Admin, Role::LeadGuide]),
        );
        router.add_route(
            Method::GET,
            "/api/v1/tours/{id}",
            "getTour",
            Access::Public,
        );
        router.add_route(
            Method::DELETE,
            "/api/v1/tours/{id}",
            "deleteTour",
            Access::Restricted(vec![Role::Admin, Role::LeadGuide]),
        );
        router
    }

    #[test]
    fn matches_method_and_path() {
        let router = natours_router();
        let m = router.match_route(&Method::GET, "/api/v1/tours").unwrap();
        assert_eq!(m.operation_id(), "listTours");
        assert_eq!(*m.access(), Access::Public);
        assert!(m.params().is_empty());
    }

    #[test]
    fn extracts_path_parameters() {
        let router = natours_router();
        let m = router
            .match_route(&Method::GET, "/api/v1/tours/5c88fa8cf4afda39709c2955")
            .unwrap();
        assert_eq!(m.operation_id(), "getTour");
        assert_eq!(m.param("id"), Some("5c88fa8cf4afda39709c2955"));
    }

    #[test]
    fn method_mismatch_does_not_match() {
        let router = natours_router();
        assert!(router.match_route(&Method::PUT, "/api/v1/tours").is_none());
    }

    #[test]
    fn segment_count_mismatch_does_not_match() {
        let router = natours_router();
        assert!(router
            .match_route(&Method::GET, "/api/v1/tours/1/extra")
            .is_none());
    }

    #[test]
    fn first_registered_route_wins() {
        let mut router = Router::new();
        router.add_route(Method::GET, "/t/{a}", "byParam", Access::Public);
        router.add_route(Method::GET, "/t/fixed", "byLiteral", Access::Public);
        let m = router.match_route(&Method::GET, "/t/fixed").unwrap();
        assert_eq!(m.operation_id(), "byParam");
    }

    #[test]
    fn restricted_access_carries_role_list() {
        let router = natours_router();
        let m = router.match_route(&Method::POST, "/api/v1/tours").unwrap();
        assert_eq!(
            *m.access(),
            Access::Restricted(vec![Role::Admin, Role::LeadGuide])
        );
    }

    #[test]
    fn trailing_slash_is_normalized() {
        let router = natours_router();
        assert!(router.match_route(&Method::GET, "/api/v1/tours/").is_some());
    }

    #[test]
    fn into_parts_yields_path_params() {
        let router = natours_router();
        let m = router
            .match_route(&Method::DELETE, "/api/v1/tours/42")
            .unwrap();
        let (op, access, params) = m.into_parts();
        assert_eq!(op, "deleteTour");
        assert!(matches!(access, Access::Restricted(_)));
        assert_eq!(params.get("id"), Some("42"));
    }
}
