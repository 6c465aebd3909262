//! The built-in shaping stages, in pipeline order.

pub mod body_limit;
pub mod param_pollution;
pub mod rate_limit;
pub mod sanitize;
pub mod security_headers;

pub use body_limit::BodyBoundStage;
pub use param_pollution::ParameterDedupStage;
pub use rate_limit::{RateLimitConfig, RateLimitStage, RateLimiterHandle};
pub use sanitize::{MarkupSanitizeStage, OperatorSanitizeStage};
pub use security_headers::SecurityHeaders;
