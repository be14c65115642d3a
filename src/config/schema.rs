//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, backlog).
    pub listener: ListenerConfig,

    /// Worker pool and handoff queue sizing.
    pub workers: WorkerConfig,

    /// Document root and handler paths.
    pub content: ContentConfig,

    /// Per-request parsing limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Listen backlog depth.
    pub backlog: u32,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            backlog: 128,
        }
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of worker threads started at initialization.
    pub pool_size: usize,

    /// Capacity of the connection handoff queue (backpressure point).
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pool_size: 8,
            queue_capacity: 1024,
        }
    }
}

/// Content layout on disk and the routing surface built on it.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Directory served for static and CGI requests.
    pub document_root: String,

    /// Path substituted for `/` and appended to directory requests.
    pub default_document: String,

    /// Path prefix routed to subprocess execution.
    pub cgi_prefix: String,

    /// Directory multipart uploads are written to.
    pub uploads_dir: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            document_root: "www".to_string(),
            default_document: "/index.html".to_string(),
            cgi_prefix: "/cgi-bin/".to_string(),
            uploads_dir: "uploads".to_string(),
        }
    }
}

/// Request parsing limits.
///
/// Every bounded field fails with an explicit error when exceeded; nothing
/// is silently truncated.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum size of the request line plus headers, terminator included.
    pub max_header_bytes: usize,
    pub max_method_len: usize,
    pub max_path_len: usize,
    pub max_version_len: usize,
    pub max_header_name_len: usize,
    pub max_header_value_len: usize,
    /// Headers beyond this count are ignored.
    pub max_headers: usize,
    /// Query pairs beyond this count are ignored.
    pub max_query_params: usize,
    /// Largest accepted `Content-Length`.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_header_bytes: 8192,
            max_method_len: 16,
            max_path_len: 1024,
            max_version_len: 16,
            max_header_name_len: 64,
            max_header_value_len: 4096,
            max_headers: 32,
            max_query_params: 32,
            max_body_bytes: 8 * 1024 * 1024, // 8MB
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.workers.pool_size, 8);
        assert_eq!(config.workers.queue_capacity, 1024);
        assert_eq!(config.content.default_document, "/index.html");
        assert_eq!(config.content.cgi_prefix, "/cgi-bin/");
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            [workers]
            pool_size = 2

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.workers.pool_size, 2);
        assert_eq!(config.workers.queue_capacity, 1024);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.observability.log_level, "info");
    }
}
