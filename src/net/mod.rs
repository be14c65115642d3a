//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (non-blocking accept, readiness poll)
//!     → held until bytes are pending (peek)
//!     → connection.rs (switch to blocking, lifecycle tracking)
//!     → queue.rs (bounded FIFO, blocks the acceptor when full)
//!     → Hand off to a worker
//!
//! Connection States:
//!     Accepted → Held → Queued → Served → Closed
//! ```
//!
//! # Design Decisions
//! - Bounded queue is the only backpressure point
//! - Idle connections cost no worker time
//! - Exactly one owner per connection at any moment

pub mod connection;
pub mod listener;
pub mod queue;
