//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! ParsedRequest (method, path, Content-Type)
//!     → router.rs (rewrite `/`, walk rules in order)
//!     → matcher.rs (evaluate match conditions)
//!     → Route → handler → Outcome
//!
//! Rule order (first match wins):
//!     cgi prefix + GET/POST      → Cgi
//!     POST + multipart/form-data → Upload
//!     POST                       → Echo
//!     GET/HEAD                   → Static
//!     DELETE                     → Delete
//!     anything else              → Reject (400)
//! ```
//!
//! # Design Decisions
//! - Rules built once at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always selects the same route

pub mod matcher;
pub mod router;

pub use router::{Outcome, Route, Router};
