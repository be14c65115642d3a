//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::fs;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use pooled_httpd::{HttpServer, ServerConfig, Shutdown};
use tempfile::TempDir;

/// A running server over a temporary document root.
pub struct TestServer {
    pub addr: SocketAddr,
    dir: TempDir,
    shutdown: Shutdown,
    acceptor: Option<JoinHandle<()>>,
}

impl TestServer {
    pub fn root(&self) -> PathBuf {
        self.dir.path().join("www")
    }

    pub fn uploads(&self) -> PathBuf {
        self.dir.path().join("uploads")
    }

    pub fn connect(&self) -> TcpStream {
        let stream = TcpStream::connect(self.addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(10)))
            .unwrap();
        stream
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
        if let Some(handle) = self.acceptor.take() {
            let _ = handle.join();
        }
    }
}

/// Start a server on an ephemeral port with a small site:
/// `index.html` (200 bytes of `a`), `style.css`, and `upload.txt`.
pub fn start_server(configure: impl FnOnce(&mut ServerConfig)) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("www");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("index.html"), vec![b'a'; 200]).unwrap();
    fs::write(root.join("style.css"), "body { color: red; }").unwrap();
    fs::write(root.join("upload.txt"), "delete me").unwrap();
    fs::write(dir.path().join("secret.txt"), "top secret").unwrap();

    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.workers.pool_size = 4;
    config.workers.queue_capacity = 16;
    config.content.document_root = root.to_string_lossy().into_owned();
    config.content.uploads_dir = dir.path().join("uploads").to_string_lossy().into_owned();
    configure(&mut config);

    let server = HttpServer::bind(config).unwrap();
    let addr = server.local_addr().unwrap();
    let shutdown = server.shutdown_handle();
    let acceptor = thread::spawn(move || server.run().unwrap());

    TestServer {
        addr,
        dir,
        shutdown,
        acceptor: Some(acceptor),
    }
}

/// Write an executable script under the document root.
#[cfg(unix)]
pub fn install_script(root: &Path, relative: &str, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// A response as seen on the wire.
#[derive(Debug)]
pub struct RawResponse {
    pub status_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn status(&self) -> u16 {
        self.status_line
            .split(' ')
            .nth(1)
            .and_then(|s| s.parse().ok())
            .unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn parse_head(head: &str) -> (String, Vec<(String, String)>) {
    let mut lines = head.split("\r\n");
    let status_line = lines.next().unwrap().to_string();
    let headers = lines
        .filter(|l| !l.is_empty())
        .map(|l| {
            let (n, v) = l.split_once(':').unwrap();
            (n.trim().to_string(), v.trim().to_string())
        })
        .collect();
    (status_line, headers)
}

/// Read one framed response. With `has_body == false` (HEAD) the
/// `Content-Length` is not consumed. Without `Content-Length` the body runs
/// to end of stream.
pub fn read_response(stream: &mut TcpStream, has_body: bool) -> RawResponse {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        let n = stream.read(&mut byte).unwrap();
        assert!(n > 0, "connection closed before response head was complete");
        head.push(byte[0]);
    }
    let (status_line, headers) = parse_head(&String::from_utf8(head).unwrap());
    let mut response = RawResponse {
        status_line,
        headers,
        body: Vec::new(),
    };

    if !has_body {
        return response;
    }
    match response.header("Content-Length").map(|v| v.parse::<usize>().unwrap()) {
        Some(len) => {
            let mut body = vec![0u8; len];
            stream.read_exact(&mut body).unwrap();
            response.body = body;
        }
        None => {
            stream.read_to_end(&mut response.body).unwrap();
        }
    }
    response
}

/// Send `raw` on a fresh connection and read one response.
pub fn send(server: &TestServer, raw: &[u8]) -> RawResponse {
    let mut stream = server.connect();
    stream.write_all(raw).unwrap();
    let has_body = !raw.starts_with(b"HEAD ");
    read_response(&mut stream, has_body)
}

/// True if the server closed `stream` (read returns EOF).
pub fn is_closed(stream: &mut TcpStream) -> bool {
    let mut buf = [0u8; 1];
    matches!(stream.read(&mut buf), Ok(0))
}
