//! Worker subsystem.
//!
//! # Data Flow
//! ```text
//! BoundedQueue<Connection>
//!     → pool.rs (N blocking threads, dequeue in FIFO order)
//!     → ConnectionHandler::serve (request loop until close)
//! ```

pub mod pool;

pub use pool::WorkerPool;
