//! Repeated query parameter collapse.
//!
//! A repeated query parameter would otherwise reach handlers as an
//! ambiguous multi-value. This stage collapses repeats before routing:
//! the last occurrence wins, except for whitelisted filter parameters
//! whose occurrences are joined with commas in appearance order (so
//! `?duration=5&duration=9` stays a two-value filter).
//!
//! Values are carried through verbatim; the stage never percent-decodes
//! or re-encodes them.

use std::collections::HashSet;

use wayfarer_core::{AppError, BoxFuture, RequestContext};

use crate::middleware::{Middleware, Next};
use crate::pipeline::Stage;
use crate::types::{rewrite_query, Request, Response};

/// Filter parameters allowed to repeat.
pub const DEFAULT_WHITELIST: [&str; 6] = [
    "duration",
    "ratingsQuantity",
    "ratingsAverage",
    "maxGroupSize",
    "difficulty",
    "price",
];

/// Collapses repeated query parameters.
pub struct ParameterDedupStage {
    whitelist: HashSet<String>,
}

impl ParameterDedupStage {
    /// Creates the stage with the default filter whitelist.
    #[must_use]
    pub fn new() -> Self {
        Self::with_whitelist(DEFAULT_WHITELIST)
    }

    /// Creates the stage with an explicit whitelist.
    #[must_use]
    pub fn with_whitelist<I>(whitelist: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            whitelist: whitelist.into_iter().map(Into::into).collect(),
        }
    }

    fn collapse(&self, query: &str) -> String {
        // Names in first-appearance order, each with its surviving
        // value. `None` marks a bare name with no `=`, carried through
        // as-is.
        let mut order: Vec<String> = Vec::new();
        let mut values: Vec<(String, Option<String>)> = Vec::new();

        for segment in query.split('&').filter(|s| !s.is_empty()) {
            let (name, value) = match segment.split_once('=') {
                Some((n, v)) => (n.to_owned(), Some(v.to_owned())),
                None => (segment.to_owned(), None),
            };
            match values.iter_mut().find(|(n, _)| *n == name) {
                None => {
                    order.push(name.clone());
                    values.push((name, value));
                }
                Some((_, existing)) => {
                    if self.whitelist.contains(&name) {
                        let mut joined = existing.take().unwrap_or_default();
                        joined.push(',');
                        joined.push_str(value.as_deref().unwrap_or(""));
                        *existing = Some(joined);
                    } else {
                        *existing = value;
                    }
                }
            }
        }

        order
            .iter()
            .filter_map(|name| values.iter().find(|(n, _)| n == name))
            .map(|(name, value)| match value {
                Some(value) => format!("{name}={value}"),
                None => name.clone(),
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl Default for ParameterDedupStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for ParameterDedupStage {
    fn name(&self) -> &'static str {
        Stage::ParameterDedup.name()
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        mut request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<Response, AppError>> {
        Box::pin(async move {
            if let Some(query) = request.uri().query() {
                let collapsed = self.collapse(query);
                if collapsed != query {
                    rewrite_query(&mut request, &collapsed);
                }
            }
            next.run(ctx, request).await
        })
    }
}
