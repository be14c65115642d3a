//! Response construction and serialization.
//!
//! # Responsibilities
//! - Build status line and headers for every handler
//! - Serialize fixed error pages (400/404/500)
//! - Stream file bodies without copying through user space where possible
//!
//! # Design Decisions
//! - Status line mirrors the request version (HTTP/1.0 or HTTP/1.1)
//! - Error pages always carry `Connection: close`
//! - HEAD responses keep the GET `Content-Length` but send no body

use std::fs::File;
use std::io::{self, Write};
use std::net::TcpStream;

use crate::http::transfer;

/// Status codes this server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    BadRequest,
    NotFound,
    InternalServerError,
}

impl StatusCode {
    pub fn as_u16(self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::InternalServerError => 500,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }

    pub fn is_error(self) -> bool {
        self.as_u16() >= 400
    }
}

/// Protocol version written on the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Version {
    Http10,
    #[default]
    Http11,
}

impl Version {
    /// Version to answer with, given the request's version token.
    pub fn for_request(version: &str) -> Self {
        if version == "HTTP/1.0" {
            Version::Http10
        } else {
            Version::Http11
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
        }
    }
}

/// Response payload.
#[derive(Debug)]
pub enum Body {
    Empty,
    Bytes(Vec<u8>),
    /// Sent with a zero-copy transfer.
    File { file: File, len: u64 },
}

/// An HTTP response ready to be written to a client.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(&'static str, String)>,
    content_length: Option<u64>,
    body: Body,
    keep_alive: bool,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            content_length: None,
            body: Body::Empty,
            keep_alive: false,
        }
    }

    /// Fixed-body error page. Always closes the connection.
    pub fn error(status: StatusCode) -> Self {
        Self::new(status).with_bytes(status.reason().as_bytes().to_vec(), "text/plain")
    }

    pub fn ok() -> Self {
        Self::new(StatusCode::Ok)
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn with_bytes(mut self, bytes: Vec<u8>, content_type: &str) -> Self {
        self.content_length = Some(bytes.len() as u64);
        self.body = Body::Bytes(bytes);
        self.header("Content-Type", content_type)
    }

    pub fn with_file(mut self, file: File, len: u64, content_type: &str) -> Self {
        self.content_length = Some(len);
        self.body = Body::File { file, len };
        self.header("Content-Type", content_type)
    }

    /// Explicit empty body with `Content-Length: 0`.
    pub fn with_empty_body(mut self) -> Self {
        self.content_length = Some(0);
        self.body = Body::Empty;
        self
    }

    /// Drop the payload but keep the headers it produced.
    pub fn without_body(mut self) -> Self {
        self.body = Body::Empty;
        self
    }

    /// Request `Connection: keep-alive`. Ignored for error responses.
    pub fn set_keep_alive(&mut self, keep_alive: bool) {
        self.keep_alive = keep_alive && !self.status.is_error();
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Serialized status line and headers, terminated by CRLFCRLF.
    pub fn head_bytes(&self, version: Version) -> Vec<u8> {
        let mut head = format!(
            "{} {} {}\r\n",
            version.as_str(),
            self.status.as_u16(),
            self.status.reason()
        );
        if let Some(len) = self.content_length {
            head.push_str(&format!("Content-Length: {}\r\n", len));
        }
        for (name, value) in &self.headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        let connection = if self.keep_alive { "keep-alive" } else { "close" };
        head.push_str(&format!("Connection: {}\r\n\r\n", connection));
        head.into_bytes()
    }

    /// Write the head only; the caller streams the body itself.
    pub fn write_head<W: Write>(&self, out: &mut W, version: Version) -> io::Result<()> {
        out.write_all(&self.head_bytes(version))
    }

    /// Write the full response. Returns body bytes sent.
    ///
    /// Fails with `UnexpectedEof` if a file body ends before its declared
    /// length, so the caller must not reuse the connection.
    pub fn write_to(self, out: &TcpStream, version: Version) -> io::Result<u64> {
        let mut out = out;
        self.write_head(&mut out, version)?;
        match self.body {
            Body::Empty => Ok(0),
            Body::Bytes(bytes) => {
                out.write_all(&bytes)?;
                Ok(bytes.len() as u64)
            }
            Body::File { file, len } => {
                let sent = transfer::send_file(&file, len, out)?;
                if sent < len {
                    // Content-Length already promised `len`; the framing is broken.
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("file shrank during transfer: sent {} of {} bytes", sent, len),
                    ));
                }
                Ok(sent)
            }
        }
    }
}
