//! Subprocess-generated content.
//!
//! # Responsibilities
//! - Resolve the script under the document root (same containment as static files)
//! - Spawn it with CGI-style environment variables
//! - Feed a POST body to its stdin and stream its stdout to the client
//!
//! # Design Decisions
//! - The response head is written only after the spawn succeeds, so a
//!   failure can still be answered with a clean `500`
//! - Output has no framing: the response always closes the connection
//! - The child is killed and reaped if streaming stops early

use std::io::{self, Write};
use std::net::TcpStream;
use std::process::{Child, Command, Stdio};
use std::thread;

use crate::http::method::Method;
use crate::http::request::ParsedRequest;
use crate::http::response::{Response, Version};
use crate::observability::metrics;
use crate::security::path::{PathResolver, ResolveError};

/// Error type for subprocess handling.
#[derive(Debug, thiserror::Error)]
pub enum CgiError {
    /// Script could not be resolved under the document root.
    #[error("script not found: {0}")]
    NotFound(#[from] ResolveError),
    /// Child was spawned without the expected pipes.
    #[error("child process pipes unavailable")]
    Pipe,
    /// The child could not be started.
    #[error("failed to spawn script: {0}")]
    Spawn(io::Error),
    /// The client went away while output was streaming.
    #[error("failed to stream script output: {0}")]
    Output(io::Error),
}

/// Kills and reaps the child unless it was waited for.
struct ChildGuard {
    child: Child,
    reaped: bool,
}

impl ChildGuard {
    fn wait(&mut self) -> io::Result<std::process::ExitStatus> {
        let status = self.child.wait()?;
        self.reaped = true;
        Ok(status)
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if !self.reaped {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Run the script named by `req.path` and stream its output to `out`.
///
/// Returns the number of output bytes relayed. A head has been written
/// only when this returns `Ok` or `Err(CgiError::Output)`.
pub fn execute(
    resolver: &PathResolver,
    req: &ParsedRequest,
    out: &TcpStream,
    version: Version,
) -> Result<u64, CgiError> {
    let script = resolver.resolve(&req.path)?;
    let forward_body = req.method == Method::Post;

    let mut command = Command::new(script.as_path());
    command
        .env("REQUEST_METHOD", req.method.as_str())
        .env("QUERY_STRING", &req.query_string)
        .env("CONTENT_LENGTH", req.body.len().to_string())
        .env("CONTENT_TYPE", req.content_type().unwrap_or(""))
        .env("SCRIPT_NAME", &req.path)
        .env("SERVER_PROTOCOL", &req.version)
        .stdin(if forward_body {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());

    let child = command.spawn().map_err(|e| {
        metrics::record_cgi_spawn_failure();
        tracing::error!(script = %script.as_path().display(), error = %e, "Failed to spawn script");
        CgiError::Spawn(e)
    })?;
    let mut guard = ChildGuard {
        child,
        reaped: false,
    };
    tracing::debug!(script = %script.as_path().display(), pid = guard.child.id(), "Script started");

    let mut stdout = guard.child.stdout.take().ok_or(CgiError::Pipe)?;
    let stdin = guard.child.stdin.take();
    if forward_body && stdin.is_none() {
        return Err(CgiError::Pipe);
    }

    let mut head = Response::ok();
    if req.method == Method::Get {
        head = head.header("Set-Cookie", "visited=1");
    }
    let mut writer = out;
    head.write_head(&mut writer, version)
        .map_err(CgiError::Output)?;

    let body = req.body.as_slice();
    let copied = thread::scope(|scope| {
        if let Some(mut stdin) = stdin {
            scope.spawn(move || {
                // Dropping stdin afterwards signals EOF to the script.
                if let Err(e) = stdin.write_all(body) {
                    tracing::debug!(error = %e, "Script stopped reading its input");
                }
            });
        }
        let copied = io::copy(&mut stdout, &mut writer);
        if copied.is_err() {
            // Unblocks the stdin feeder if the script is not reading.
            let _ = guard.child.kill();
        }
        copied
    });

    match guard.wait() {
        Ok(status) if !status.success() => {
            tracing::debug!(status = %status, "Script exited unsuccessfully");
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "Failed to reap script"),
    }
    copied.map_err(CgiError::Output)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::http::request::{Headers, QueryParams};
    use std::fs;
    use std::io::Read;
    use std::net::TcpListener;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn site() -> (TempDir, PathResolver) {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("cgi-bin");
        fs::create_dir_all(&bin).unwrap();
        let script = bin.join("env.sh");
        fs::write(&script, "#!/bin/sh\necho \"$REQUEST_METHOD $QUERY_STRING\"\ncat\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        fs::write(bin.join("plain.txt"), "not executable").unwrap();
        let resolver = PathResolver::new(dir.path(), "/index.html");
        (dir, resolver)
    }

    fn request(method: Method, path: &str, query: &str, body: &[u8]) -> ParsedRequest {
        ParsedRequest {
            method,
            path: path.to_string(),
            version: "HTTP/1.1".to_string(),
            headers: Headers::new(),
            query_string: query.to_string(),
            query: QueryParams::parse(query, 8),
            body: body.to_vec(),
        }
    }

    /// Run `execute` against a loopback socket and return what the client saw.
    fn run(resolver: &PathResolver, req: &ParsedRequest) -> (Result<u64, CgiError>, String) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();

        let result = execute(resolver, req, &server, Version::Http11);
        drop(server);

        let mut received = String::new();
        client.read_to_string(&mut received).unwrap();
        (result, received)
    }

    #[test]
    fn get_streams_output_with_environment() {
        let (_dir, resolver) = site();
        let req = request(Method::Get, "/cgi-bin/env.sh", "a=1", b"");
        let (result, received) = run(&resolver, &req);

        assert!(result.is_ok());
        assert!(received.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(received.contains("Set-Cookie: visited=1\r\n"));
        assert!(received.contains("Connection: close\r\n\r\n"));
        assert!(received.ends_with("GET a=1\n"));
    }

    #[test]
    fn post_body_is_forwarded_to_stdin() {
        let (_dir, resolver) = site();
        let req = request(Method::Post, "/cgi-bin/env.sh", "", b"payload");
        let (result, received) = run(&resolver, &req);

        assert!(result.is_ok());
        assert!(!received.contains("Set-Cookie"));
        assert!(received.ends_with("POST \npayload"));
    }

    #[test]
    fn missing_script_is_not_found_and_writes_nothing() {
        let (_dir, resolver) = site();
        let req = request(Method::Get, "/cgi-bin/missing.sh", "", b"");
        let (result, received) = run(&resolver, &req);
        assert!(matches!(result, Err(CgiError::NotFound(_))));
        assert!(received.is_empty());
    }

    #[test]
    fn non_executable_script_fails_to_spawn() {
        let (_dir, resolver) = site();
        let req = request(Method::Get, "/cgi-bin/plain.txt", "", b"");
        let (result, received) = run(&resolver, &req);
        assert!(matches!(result, Err(CgiError::Spawn(_))));
        assert!(received.is_empty());
    }
}
