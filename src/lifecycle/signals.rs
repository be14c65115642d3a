//! OS signal handling.
//!
//! # Responsibilities
//! - Register handlers for SIGINT and SIGTERM
//! - Translate them into a [`Shutdown`] trigger
//!
//! # Design Decisions
//! - The handler runs on ctrlc's own thread, never inside a signal context
//! - A repeated signal triggers again; the acceptor is already stopping

use crate::lifecycle::Shutdown;

/// Route SIGINT/SIGTERM to `shutdown`. May only be installed once per process.
pub fn install_signal_handlers(shutdown: Shutdown) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        tracing::info!("Shutdown signal received");
        shutdown.trigger();
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use mio::{Poll, Token, Waker};
    use std::time::{Duration, Instant};

    #[test]
    fn sigterm_triggers_shutdown() {
        let poll = Poll::new().unwrap();
        let shutdown = Shutdown::new(Waker::new(poll.registry(), Token(0)).unwrap());
        install_signal_handlers(shutdown.clone()).unwrap();

        // SAFETY: a handler for SIGTERM was installed just above.
        assert_eq!(unsafe { libc::raise(libc::SIGTERM) }, 0);

        let deadline = Instant::now() + Duration::from_secs(5);
        while !shutdown.is_triggered() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(shutdown.is_triggered());
    }
}
