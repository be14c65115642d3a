//! HTTP server setup.
//!
//! # Responsibilities
//! - Validate configuration and bind the listener
//! - Build the router and start the worker pool
//! - Run the acceptor on the calling thread until shutdown
//!
//! # Startup Order
//! validate → bind → queue → workers → acceptor

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::{validate_config, ServerConfig, ValidationError};
use crate::http::handler::ConnectionHandler;
use crate::lifecycle::Shutdown;
use crate::net::connection::Connection;
use crate::net::listener::{bind_listener, Acceptor, ListenerError};
use crate::net::queue::BoundedQueue;
use crate::routing::Router;
use crate::worker::WorkerPool;

/// Error type for server startup and run.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid configuration: {}", crate::config::loader::join_errors(.0))]
    Config(Vec<ValidationError>),
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error("failed to start workers: {0}")]
    Workers(io::Error),
    #[error("acceptor failed: {0}")]
    Acceptor(io::Error),
}

/// A bound server with its workers running.
pub struct HttpServer {
    acceptor: Acceptor,
    workers: WorkerPool,
}

impl HttpServer {
    /// Bind and start workers. Connections are accepted once [`HttpServer::run`] is called.
    pub fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        validate_config(&config).map_err(ServerError::Config)?;

        let listener = bind_listener(&config.listener)?;
        let queue: Arc<BoundedQueue<Connection>> =
            Arc::new(BoundedQueue::new(config.workers.queue_capacity));
        let acceptor = Acceptor::new(listener, Arc::clone(&queue))?;

        let router = Arc::new(Router::from_config(&config.content));
        let handler = ConnectionHandler::new(router, config.limits.clone());
        let workers = WorkerPool::start(config.workers.pool_size, queue, move |conn| {
            handler.serve(conn)
        })
        .map_err(ServerError::Workers)?;

        tracing::info!(
            document_root = %config.content.document_root,
            workers = workers.size(),
            queue_capacity = config.workers.queue_capacity,
            "Server ready"
        );
        Ok(Self { acceptor, workers })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.acceptor.local_addr()
    }

    /// Handle that makes [`HttpServer::run`] return.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.acceptor.shutdown_handle()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.size()
    }

    /// Accept and dispatch connections until shutdown. Blocks the caller.
    pub fn run(self) -> Result<(), ServerError> {
        if let Ok(addr) = self.acceptor.local_addr() {
            tracing::info!(address = %addr, "HTTP server listening");
        }
        self.acceptor.run().map_err(ServerError::Acceptor)?;
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
