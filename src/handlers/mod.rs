//! Content handlers.
//!
//! # Data Flow
//! ```text
//! Route
//!     → static_files.rs (GET/HEAD file delivery, DELETE)
//!     → cgi.rs (spawn script, stream stdout)
//!     → upload.rs (multipart parts → uploads dir)
//!     → echo.rs (body back verbatim)
//!     → Response (or output already streamed)
//! ```
//!
//! # Design Decisions
//! - Every filesystem lookup goes through the document-root resolver
//! - Resolution failures of any kind are answered as `404`

pub mod cgi;
pub mod echo;
pub mod mime;
pub mod static_files;
pub mod upload;
