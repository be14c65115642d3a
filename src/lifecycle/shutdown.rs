//! Shutdown coordination for the server.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mio::Waker;

/// Handle that stops the acceptor loop.
///
/// Triggering wakes the acceptor's readiness wait; it then closes every
/// connection it still holds and returns. Connections already handed to
/// workers are served to completion.
#[derive(Debug, Clone)]
pub struct Shutdown {
    triggered: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl Shutdown {
    /// Create a coordinator that wakes `waker` when triggered.
    pub fn new(waker: Waker) -> Self {
        Self {
            triggered: Arc::new(AtomicBool::new(false)),
            waker: Arc::new(waker),
        }
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        if let Err(e) = self.waker.wake() {
            tracing::warn!(error = %e, "Failed to wake acceptor for shutdown");
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}
