//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (pool size > 0, addresses parse)
//! - Check path prefixes have the shape routing expects
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ServerConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },
    #[error("{field} must start with '/': {value}")]
    NotAbsolute { field: &'static str, value: String },
    #[error("content.cgi_prefix must end with '/': {0}")]
    PrefixWithoutSlash(String),
    #[error("content.document_root must not be empty")]
    EmptyDocumentRoot,
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.listener.backlog == 0 {
        errors.push(ValidationError::Zero { field: "listener.backlog" });
    }

    if config.workers.pool_size == 0 {
        errors.push(ValidationError::Zero { field: "workers.pool_size" });
    }
    if config.workers.queue_capacity == 0 {
        errors.push(ValidationError::Zero { field: "workers.queue_capacity" });
    }

    let content = &config.content;
    if content.document_root.is_empty() {
        errors.push(ValidationError::EmptyDocumentRoot);
    }
    if !content.default_document.starts_with('/') {
        errors.push(ValidationError::NotAbsolute {
            field: "content.default_document",
            value: content.default_document.clone(),
        });
    }
    if !content.cgi_prefix.starts_with('/') {
        errors.push(ValidationError::NotAbsolute {
            field: "content.cgi_prefix",
            value: content.cgi_prefix.clone(),
        });
    } else if !content.cgi_prefix.ends_with('/') {
        errors.push(ValidationError::PrefixWithoutSlash(content.cgi_prefix.clone()));
    }

    let limits = &config.limits;
    for (field, value) in [
        ("limits.max_header_bytes", limits.max_header_bytes),
        ("limits.max_method_len", limits.max_method_len),
        ("limits.max_path_len", limits.max_path_len),
        ("limits.max_version_len", limits.max_version_len),
        ("limits.max_header_name_len", limits.max_header_name_len),
        ("limits.max_header_value_len", limits.max_header_value_len),
    ] {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
