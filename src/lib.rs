//! Pooled HTTP/1.x server library.
//!
//! A readiness-driven acceptor hands connections with pending bytes to a
//! bounded queue drained by a fixed pool of blocking worker threads.

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod routing;

// Content handling
pub mod handlers;
pub mod worker;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
