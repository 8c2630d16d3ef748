//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Resolve the filter from `RUST_LOG` or configuration
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Logs go to stderr; stdout carries the operator report
//! - `RUST_LOG` wins over the configured level

use std::io;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive for a configured level.
pub fn default_directive(level: &str) -> String {
    format!("isle_ingress={level},isle_fragment={level},registry_cli={level},warn")
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .try_init();

    if result.is_err() {
        tracing::debug!("Logging already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(
            default_directive("debug"),
            "isle_ingress=debug,isle_fragment=debug,registry_cli=debug,warn"
        );
        assert!(EnvFilter::try_new(default_directive("info")).is_ok());
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging("info");
        init_logging("debug");
    }
}
