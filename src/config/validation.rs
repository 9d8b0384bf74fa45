//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and value ranges (timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - The histogram bucket layout is checked by the metrics registry, which
//!   owns it
//! - Validation is pure function: Config → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::Config;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("server.metrics_addr must differ from server.listen_addr ({0})")]
    SharedAddress(String),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("service_name must not be empty")]
    EmptyServiceName,
}

pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let server = &config.server;

    if config.service_name.trim().is_empty() {
        errors.push(ValidationError::EmptyServiceName);
    }

    let listen = check_address(&mut errors, "server.listen_addr", &server.listen_addr);
    if server.metrics_enabled() {
        let metrics = check_address(&mut errors, "server.metrics_addr", &server.metrics_addr);
        // Port 0 asks the OS for a fresh port, so two of them never collide.
        if let (Some(listen), Some(metrics)) = (listen, metrics) {
            if listen == metrics && listen.port() != 0 {
                errors.push(ValidationError::SharedAddress(server.listen_addr.clone()));
            }
        }
    }

    for (field, value) in [
        ("server.graceful_shutdown_ms", server.graceful_shutdown_ms),
        ("server.read_timeout_ms", server.read_timeout_ms),
        ("server.write_timeout_ms", server.write_timeout_ms),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroDuration(field));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(
    errors: &mut Vec<ValidationError>,
    field: &'static str,
    value: &str,
) -> Option<SocketAddr> {
    let parsed = value.parse::<SocketAddr>().ok();
    if parsed.is_none() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
    parsed
}
