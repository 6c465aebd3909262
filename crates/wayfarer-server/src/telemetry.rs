//! Logging initialization.
//!
//! Thin wrapper over `tracing-subscriber`: a small config struct with
//! per-environment presets and a single init call a binary makes once
//! at startup. Components never initialize logging themselves.

use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use wayfarer_core::Environment;

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Whether to emit JSON lines instead of human-readable output.
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::development()
    }
}

impl LogConfig {
    /// Human-readable output at debug level.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_owned(),
            json_format: false,
        }
    }

    /// JSON output at info level.
    #[must_use]
    pub fn production() -> Self {
        Self {
            level: "info".to_owned(),
            json_format: true,
        }
    }

    /// Returns the preset for an environment.
    #[must_use]
    pub fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Development => Self::development(),
            Environment::Production => Self::production(),
        }
    }
}

/// Initializes the global subscriber. Call once, from the binary.
///
/// `RUST_LOG` overrides the configured default level. Errors if a
/// global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.json_format {
        builder.json().finish().try_init()
    } else {
        builder.finish().try_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_track_the_environment() {
        let dev = LogConfig::for_environment(Environment::Development);
        assert!(!dev.json_format);
        assert_eq!(dev.level, "debug");

        let prod = LogConfig::for_environment(Environment::Production);
        assert!(prod.json_format);
        assert_eq!(prod.level, "info");
    }
}
