//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Connection (blocking socket, owned by one worker)
//!     → request.rs (frame head and body, enforce limits)
//!     → handler.rs (request ID, access log, keep-alive loop)
//!     → [routing layer picks the content handler]
//!     → response.rs (status line, headers, body)
//!     → transfer.rs (zero-copy file bodies)
//!     → Send to client
//! ```

pub mod handler;
pub mod method;
pub mod request;
pub mod response;
pub mod server;
pub mod transfer;

pub use handler::ConnectionHandler;
pub use method::Method;
pub use request::{ParseError, ParsedRequest, RequestReader};
pub use response::{Response, StatusCode, Version};
pub use server::{HttpServer, ServerError};
