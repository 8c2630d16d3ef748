//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ports non-zero and distinct)
//! - Reject empty paths and unknown log levels
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: IsleConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use super::schema::IsleConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &IsleConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.registry.path.trim().is_empty() {
        errors.push(ValidationError::new("registry.path", "must not be empty"));
    }
    if config.registry.lock_suffix.is_empty() {
        errors.push(ValidationError::new("registry.lock_suffix", "must not be empty"));
    }

    if let Some(command) = &config.provider.command {
        if command.trim().is_empty() {
            errors.push(ValidationError::new("provider.command", "must not be empty when set"));
        }
    }

    if config.filter.reserved_names.iter().any(|n| n.trim().is_empty()) {
        errors.push(ValidationError::new("filter.reserved_names", "entries must not be empty"));
    }

    let render = &config.render;
    if render.listen_port == 0 {
        errors.push(ValidationError::new("render.listen_port", "must be greater than 0"));
    }
    if render.http_port == 0 {
        errors.push(ValidationError::new("render.http_port", "must be greater than 0"));
    }
    if render.redirect_http && render.http_port == render.listen_port {
        errors.push(ValidationError::new(
            "render.http_port",
            "must differ from render.listen_port when redirect_http is enabled",
        ));
    }
    if render.client_ca.trim().is_empty() {
        errors.push(ValidationError::new("render.client_ca", "must not be empty"));
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&IsleConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = IsleConfig::default();
        config.registry.path = "  ".into();
        config.render.listen_port = 0;
        config.observability.log_level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, ["registry.path", "render.listen_port", "observability.log_level"]);
    }

    #[test]
    fn test_redirect_port_clash() {
        let mut config = IsleConfig::default();
        config.render.http_port = 443;
        assert!(validate_config(&config).is_err());

        config.render.redirect_http = false;
        assert!(validate_config(&config).is_ok());
    }
}
