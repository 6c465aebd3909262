//! Server configuration.
//!
//! All knobs are read once, here, and threaded into components at
//! construction time; nothing below this layer consults process
//! environment variables. A binary translates its environment (for
//! example a `WAYFARER_ENV` variable) into a [`ServerConfig`] and hands
//! it over.
//!
//! # Example
//!
//! ```rust
//! use wayfarer_server::ServerConfig;
//! use wayfarer_core::Environment;
//!
//! let config = ServerConfig::builder()
//!     .http_addr("127.0.0.1:3000")
//!     .environment(Environment::Production)
//!     .token_secret("a-long-random-secret")
//!     .build();
//!
//! assert_eq!(config.http_addr(), "127.0.0.1:3000");
//! ```

use std::net::SocketAddr;

use wayfarer_core::Environment;
use wayfarer_middleware::stages::param_pollution::DEFAULT_WHITELIST;
use wayfarer_middleware::RateLimitConfig;

/// Default HTTP bind address.
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:3000";

/// Default body bound in bytes.
pub const DEFAULT_BODY_LIMIT: usize = 10 * 1024;

/// Default credential lifetime in days.
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 90;

/// Server configuration.
///
/// Use [`ServerConfig::builder()`] to construct instances.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    http_addr: String,
    environment: Environment,
    body_limit: usize,
    rate_limit: RateLimitConfig,
    param_whitelist: Vec<String>,
    token_secret: String,
    token_ttl: chrono::Duration,
}

impl ServerConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Returns the HTTP bind address.
    #[must_use]
    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// Parses the bind address.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.http_addr.parse()
    }

    /// Returns the deployment environment.
    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Returns the body bound in bytes.
    #[must_use]
    pub fn body_limit(&self) -> usize {
        self.body_limit
    }

    /// Returns the rate limiter settings.
    #[must_use]
    pub fn rate_limit(&self) -> &RateLimitConfig {
        &self.rate_limit
    }

    /// Returns the repeat-parameter whitelist.
    #[must_use]
    pub fn param_whitelist(&self) -> &[String] {
        &self.param_whitelist
    }

    /// Returns the token signing secret.
    #[must_use]
    pub fn token_secret(&self) -> &str {
        &self.token_secret
    }

    /// Returns the credential lifetime.
    #[must_use]
    pub fn token_ttl(&self) -> chrono::Duration {
        self.token_ttl
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    http_addr: String,
    environment: Environment,
    body_limit: usize,
    rate_limit: RateLimitConfig,
    param_whitelist: Vec<String>,
    token_secret: String,
    token_ttl: chrono::Duration,
}

impl ServerConfigBuilder {
    /// Creates a builder with defaults. The token secret defaults to
    /// empty and must be set before serving protected routes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_owned(),
            environment: Environment::Development,
            body_limit: DEFAULT_BODY_LIMIT,
            rate_limit: RateLimitConfig::default(),
            param_whitelist: DEFAULT_WHITELIST.iter().map(ToString::to_string).collect(),
            token_secret: String::new(),
            token_ttl: chrono::Duration::days(DEFAULT_TOKEN_TTL_DAYS),
        }
    }

    /// Sets the HTTP bind address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = addr.into();
        self
    }

    /// Sets the deployment environment.
    #[must_use]
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Sets the body bound in bytes.
    #[must_use]
    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Sets the rate limiter settings.
    #[must_use]
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = config;
        self
    }

    /// Sets the repeat-parameter whitelist.
    #[must_use]
    pub fn param_whitelist<I>(mut self, whitelist: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.param_whitelist = whitelist.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the token signing secret.
    #[must_use]
    pub fn token_secret(mut self, secret: impl Into<String>) -> Self {
        self.token_secret = secret.into();
        self
    }

    /// Sets the credential lifetime.
    #[must_use]
    pub fn token_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            http_addr: self.http_addr,
            environment: self.environment,
            body_limit: self.body_limit,
            rate_limit: self.rate_limit,
            param_whitelist: self.param_whitelist,
            token_secret: self.token_secret,
            token_ttl: self.token_ttl,
        }
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr(), DEFAULT_HTTP_ADDR);
        assert_eq!(config.environment(), Environment::Development);
        assert_eq!(config.body_limit(), DEFAULT_BODY_LIMIT);
        assert_eq!(config.rate_limit().max_requests, 100);
        assert_eq!(config.token_ttl(), chrono::Duration::days(90));
        assert!(config.param_whitelist().contains(&"duration".to_owned()));
    }

    #[test]
    fn builder_overrides_stick() {
        let config = ServerConfig::builder()
            .http_addr("127.0.0.1:8081")
            .environment(Environment::Production)
            .body_limit(2048)
            .rate_limit(RateLimitConfig::new(5, std::time::Duration::from_secs(60)))
            .param_whitelist(["page"])
            .token_secret("s3cret")
            .token_ttl(chrono::Duration::hours(1))
            .build();

        assert_eq!(config.environment(), Environment::Production);
        assert_eq!(config.body_limit(), 2048);
        assert_eq!(config.rate_limit().max_requests, 5);
        assert_eq!(config.param_whitelist(), ["page".to_owned()]);
        assert_eq!(config.token_secret(), "s3cret");
        assert_eq!(config.token_ttl(), chrono::Duration::hours(1));
    }

    #[test]
    fn socket_addr_parses_valid_addresses() {
        let config = ServerConfig::builder().http_addr("127.0.0.1:3000").build();
        assert_eq!(config.socket_addr().unwrap().port(), 3000);
        let bad = ServerConfig::builder().http_addr("nope").build();
        assert!(bad.socket_addr().is_err());
    }
}
