//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (HttpServer::bind):
//!     Validate config → Bind listener → Build queue → Start workers
//!
//! Shutdown (signals.rs → shutdown.rs):
//!     SIGINT/SIGTERM → trigger() → Wake acceptor → Stop accepting → Close held connections → run() returns
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then listener, then workers
//! - No per-connection cancellation: dispatched connections run to completion

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::install_signal_handlers;
