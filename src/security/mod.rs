//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Request path / upload filename:
//!     → path.rs (canonicalize against document root, reject escapes)
//!     → Pass to handler
//! ```
//!
//! # Design Decisions
//! - Fail closed: anything outside the root is treated as absent
//! - No trust in client input

pub mod path;

pub use path::{PathResolver, ResolveError, ResolvedPath};
