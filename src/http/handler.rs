//! Per-connection request loop run by workers.
//!
//! # Responsibilities
//! - Read requests one after another from a dispatched connection
//! - Answer malformed input with `400` and close
//! - Dispatch, write the response, and keep going only on keep-alive
//!
//! # Design Decisions
//! - Each request gets its own request ID in the access log
//! - A failed write abandons the connection without retrying
//! - Keep-alive connections stay with the same worker until they close

use std::net::TcpStream;
use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::config::LimitsConfig;
use crate::http::request::{ParseError, ParsedRequest, RequestReader};
use crate::http::response::{Response, StatusCode, Version};
use crate::net::connection::Connection;
use crate::observability::metrics;
use crate::routing::{Outcome, Route, Router};

/// Serves every request on a connection until it closes.
#[derive(Debug, Clone)]
pub struct ConnectionHandler {
    router: Arc<Router>,
    limits: LimitsConfig,
}

impl ConnectionHandler {
    pub fn new(router: Arc<Router>, limits: LimitsConfig) -> Self {
        Self { router, limits }
    }

    /// Serve `conn`. Dropping it at the end closes the socket.
    pub fn serve(&self, conn: Connection) {
        let span = tracing::info_span!(
            "connection",
            connection_id = %conn.id(),
            peer_addr = %conn.peer()
        );
        let _guard = span.enter();
        tracing::trace!(
            waited_ms = conn.accepted_at().elapsed().as_millis() as u64,
            "Worker picked up connection"
        );

        let stream = conn.stream();
        let mut reader = RequestReader::new(stream);
        let mut served = 0u32;
        loop {
            let req = match reader.read_request(&self.limits) {
                Ok(req) => req,
                Err(e) => {
                    self.reject(stream, e);
                    break;
                }
            };
            served += 1;
            if !self.handle(stream, req) {
                break;
            }
        }
        tracing::debug!(requests = served, "Connection finished");
    }

    /// Answer one request. Returns whether the connection stays open.
    fn handle(&self, stream: &TcpStream, req: ParsedRequest) -> bool {
        let start = Instant::now();
        let request_id = Uuid::new_v4();
        let version = Version::for_request(&req.version);
        tracing::info!(
            request_id = %request_id,
            method = %req.method,
            path = %req.path,
            version = %req.version,
            query = %req.query,
            "Request received"
        );

        let (route, outcome) = self.router.dispatch(&req, stream, version);
        match outcome {
            Outcome::Respond(mut response) => {
                response.set_keep_alive(req.wants_keep_alive());
                let keep_alive = response.keep_alive();
                let status = response.status();
                match response.write_to(stream, version) {
                    Ok(bytes) => {
                        self.finish(&req, route, status, bytes, start);
                        keep_alive
                    }
                    Err(e) => {
                        tracing::warn!(request_id = %request_id, error = %e, "Failed to write response");
                        metrics::record_request(req.method.as_str(), status.as_u16(), route.name(), start);
                        false
                    }
                }
            }
            Outcome::Streamed { status, bytes } => {
                self.finish(&req, route, status, bytes, start);
                false
            }
            Outcome::Abandoned(e) => {
                tracing::debug!(request_id = %request_id, error = %e, "Client went away mid-response");
                false
            }
        }
    }

    fn finish(&self, req: &ParsedRequest, route: Route, status: StatusCode, bytes: u64, start: Instant) {
        tracing::info!(
            method = %req.method,
            path = %req.path,
            status = status.as_u16(),
            handler = route.name(),
            bytes,
            duration_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );
        metrics::record_request(req.method.as_str(), status.as_u16(), route.name(), start);
    }

    /// Malformed input gets a `400`; a clean close or socket error gets nothing.
    fn reject(&self, stream: &TcpStream, error: ParseError) {
        if error.is_clean_close() {
            tracing::trace!("Peer closed between requests");
            return;
        }
        if let ParseError::Io(e) = &error {
            tracing::debug!(error = %e, "Read failed");
            return;
        }

        tracing::info!(error = %error, "Malformed request");
        let start = Instant::now();
        if let Err(e) = Response::error(StatusCode::BadRequest).write_to(stream, Version::Http11) {
            tracing::debug!(error = %e, "Failed to send 400");
        }
        metrics::record_request("-", StatusCode::BadRequest.as_u16(), "parse", start);
    }
}
