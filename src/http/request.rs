//! Request framing and parsing.
//!
//! # Responsibilities
//! - Read one request head (request line + headers) up to a bounded size
//! - Split the query component off the path before anything else sees it
//! - Read a fixed-length body sized by a validated `Content-Length`
//! - Keep bytes read past the current request for the next keep-alive cycle
//!
//! # Design Decisions
//! - Header size limits enforced before any parsing; reads never exceed them
//! - Every bounded field fails with [`ParseError::TooLong`] instead of truncating
//! - A body shorter than its `Content-Length` is accepted as-is (peer closed early)

use std::io::{self, Read};

use memchr::memmem;

use crate::config::LimitsConfig;
use crate::http::method::Method;

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";
const READ_CHUNK: usize = 4096;

/// Malformed request. Always answered with `400` and a closed connection.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Peer closed before a complete request head arrived.
    #[error("request truncated after {received} bytes")]
    Truncated { received: usize },
    #[error("request head exceeds {limit} bytes")]
    HeadersTooLarge { limit: usize },
    #[error("request head is not valid UTF-8")]
    InvalidEncoding,
    #[error("invalid request line")]
    InvalidRequestLine,
    #[error("{field} longer than {limit} bytes")]
    TooLong { field: &'static str, limit: usize },
    #[error("invalid Content-Length: {0}")]
    InvalidContentLength(String),
    #[error("body of {length} bytes exceeds {limit}")]
    BodyTooLarge { length: usize, limit: usize },
    #[error("read failed: {0}")]
    Io(#[from] io::Error),
}

impl ParseError {
    /// True when the peer closed cleanly between requests.
    pub fn is_clean_close(&self) -> bool {
        matches!(self, ParseError::Truncated { received: 0 })
    }
}

/// Ordered header list with case-insensitive lookup.
///
/// Duplicates are retained in arrival order; lookups return the first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// First value for `name`, compared ASCII case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// Query parameters in the order they appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Split `a=1&b=2` on `&` then the first `=`. Pairs without `=` are skipped.
    /// No percent-decoding is applied.
    pub fn parse(query: &str, max_pairs: usize) -> Self {
        let pairs = query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .take(max_pairs)
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self { pairs }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl std::fmt::Display for QueryParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        Ok(())
    }
}

/// One parsed request.
#[derive(Debug, Clone)]
pub struct ParsedRequest {
    pub method: Method,
    /// Path without the query component.
    pub path: String,
    pub version: String,
    pub headers: Headers,
    /// Raw query component (text after the first `?`), empty if absent.
    pub query_string: String,
    pub query: QueryParams,
    pub body: Vec<u8>,
}

impl ParsedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    /// Client asked for `Connection: keep-alive`.
    pub fn wants_keep_alive(&self) -> bool {
        self.header("Connection")
            .map(|v| v.trim().eq_ignore_ascii_case("keep-alive"))
            .unwrap_or(false)
    }

    pub fn is_http10(&self) -> bool {
        self.version == "HTTP/1.0"
    }
}

/// Reads successive requests from one connection.
///
/// Bytes received beyond the end of a request stay buffered and start the
/// next one, so pipelined keep-alive requests are not lost.
#[derive(Debug)]
pub struct RequestReader<R> {
    inner: R,
    buffered: Vec<u8>,
}

impl<R: Read> RequestReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffered: Vec::new(),
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Read and parse the next request.
    pub fn read_request(&mut self, limits: &LimitsConfig) -> Result<ParsedRequest, ParseError> {
        let head_len = self.fill_head(limits.max_header_bytes)?;
        let head: Vec<u8> = self.buffered.drain(..head_len).collect();
        let head_text = std::str::from_utf8(&head[..head_len - HEAD_TERMINATOR.len()])
            .map_err(|_| ParseError::InvalidEncoding)?;

        let mut lines = head_text.split('\n').map(|l| l.trim_end_matches('\r'));
        let request_line = lines.next().ok_or(ParseError::InvalidRequestLine)?;
        let (method, target, version) = parse_request_line(request_line, limits)?;

        let (path, query_string) = match target.split_once('?') {
            Some((path, query)) => (path.to_string(), query.to_string()),
            None => (target.to_string(), String::new()),
        };
        let query = QueryParams::parse(&query_string, limits.max_query_params);

        let headers = parse_headers(lines, limits)?;
        let body = self.read_body(&headers, limits)?;

        Ok(ParsedRequest {
            method,
            path,
            version: version.to_string(),
            headers,
            query_string,
            query,
            body,
        })
    }

    /// Buffer bytes until the head terminator is seen. Returns the head length
    /// including the terminator.
    fn fill_head(&mut self, max_header_bytes: usize) -> Result<usize, ParseError> {
        let mut searched = 0;
        loop {
            if let Some(pos) = memmem::find(&self.buffered[searched..], HEAD_TERMINATOR) {
                let end = searched + pos + HEAD_TERMINATOR.len();
                if end > max_header_bytes {
                    return Err(ParseError::HeadersTooLarge { limit: max_header_bytes });
                }
                return Ok(end);
            }
            if self.buffered.len() >= max_header_bytes {
                return Err(ParseError::HeadersTooLarge { limit: max_header_bytes });
            }
            // Resume the search just before the old end so a split terminator is found.
            searched = self.buffered.len().saturating_sub(HEAD_TERMINATOR.len() - 1);

            let want = READ_CHUNK.min(max_header_bytes - self.buffered.len());
            let start = self.buffered.len();
            self.buffered.resize(start + want, 0);
            let read = loop {
                match self.inner.read(&mut self.buffered[start..]) {
                    Ok(n) => break n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        self.buffered.truncate(start);
                        return Err(ParseError::Io(e));
                    }
                }
            };
            self.buffered.truncate(start + read);
            if read == 0 {
                return Err(ParseError::Truncated { received: start });
            }
        }
    }

    fn read_body(
        &mut self,
        headers: &Headers,
        limits: &LimitsConfig,
    ) -> Result<Vec<u8>, ParseError> {
        let Some(raw) = headers.get("Content-Length") else {
            return Ok(Vec::new());
        };
        let length: usize = raw
            .trim()
            .parse()
            .map_err(|_| ParseError::InvalidContentLength(raw.to_string()))?;
        if length == 0 {
            return Ok(Vec::new());
        }
        if length > limits.max_body_bytes {
            return Err(ParseError::BodyTooLarge {
                length,
                limit: limits.max_body_bytes,
            });
        }

        let mut body = Vec::with_capacity(length);
        let from_buffer = length.min(self.buffered.len());
        body.extend(self.buffered.drain(..from_buffer));

        let remaining = (length - body.len()) as u64;
        if remaining > 0 {
            // A short read means the peer stopped sending; keep what arrived.
            (&mut self.inner).take(remaining).read_to_end(&mut body)?;
        }
        Ok(body)
    }
}

fn parse_request_line<'a>(
    line: &'a str,
    limits: &LimitsConfig,
) -> Result<(Method, &'a str, &'a str), ParseError> {
    let mut tokens = line.split_whitespace();
    let (Some(method), Some(target), Some(version), None) =
        (tokens.next(), tokens.next(), tokens.next(), tokens.next())
    else {
        return Err(ParseError::InvalidRequestLine);
    };

    check_len("method", method, limits.max_method_len)?;
    check_len("path", target, limits.max_path_len)?;
    check_len("version", version, limits.max_version_len)?;

    if !version.starts_with("HTTP/1.") {
        return Err(ParseError::InvalidRequestLine);
    }

    Ok((Method::parse(method), target, version))
}

fn parse_headers<'a>(
    lines: impl Iterator<Item = &'a str>,
    limits: &LimitsConfig,
) -> Result<Headers, ParseError> {
    let mut headers = Headers::new();
    for line in lines {
        if headers.len() >= limits.max_headers {
            break;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let value = value.trim();
        check_len("header name", name, limits.max_header_name_len)?;
        check_len("header value", value, limits.max_header_value_len)?;
        headers.push(name, value);
    }
    Ok(headers)
}

fn check_len(field: &'static str, value: &str, limit: usize) -> Result<(), ParseError> {
    if value.len() > limit {
        return Err(ParseError::TooLong { field, limit });
    }
    Ok(())
}
