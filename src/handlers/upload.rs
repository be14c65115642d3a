//! Multipart upload ingestion.
//!
//! Parts are scanned straight out of the request body; content is only
//! copied when it is written to disk. A part without a closing delimiter
//! ends the scan, and whatever was saved before it stays saved.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use memchr::memmem;

use crate::http::request::ParsedRequest;
use crate::http::response::{Response, StatusCode};
use crate::observability::metrics;
use crate::security::path::sanitize_file_name;

const CONFIRMATION: &[u8] = b"Upload complete\n";
const CRLF: &[u8] = b"\r\n";
const HEADER_END: &[u8] = b"\r\n\r\n";

/// Error type for upload handling.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// `Content-Type` has no usable `boundary=` attribute.
    #[error("multipart content type without boundary")]
    MissingBoundary,
    /// Writing a part to disk failed.
    #[error("failed to save upload: {0}")]
    Io(#[from] io::Error),
}

/// One part of a multipart body, borrowing from the body buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPart<'a> {
    pub filename: Option<&'a str>,
    pub content: &'a [u8],
}

/// Extract the boundary from a `multipart/form-data` content type.
pub fn parse_boundary(content_type: &str) -> Result<&str, UploadError> {
    for param in split_params(content_type).skip(1) {
        let param = param.trim();
        let Some((name, value)) = param.split_once('=') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("boundary") {
            let value = unquote(value);
            if value.is_empty() {
                return Err(UploadError::MissingBoundary);
            }
            return Ok(value);
        }
    }
    Err(UploadError::MissingBoundary)
}

fn unquote(s: &str) -> &str {
    let s = s.trim();
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Split header parameters on `;`, ignoring separators inside quoted values.
fn split_params(value: &str) -> impl Iterator<Item = &str> {
    let mut in_quotes = false;
    let mut start = 0;
    let mut params = Vec::new();
    for (i, c) in value.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                params.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(&value[start..]);
    params.into_iter()
}

/// Iterator over the parts of a multipart body.
pub struct MultipartParts<'a> {
    body: &'a [u8],
    delimiter: Vec<u8>,
    pos: usize,
    done: bool,
}

impl<'a> MultipartParts<'a> {
    pub fn new(body: &'a [u8], boundary: &str) -> Self {
        let mut delimiter = Vec::with_capacity(boundary.len() + 2);
        delimiter.extend_from_slice(b"--");
        delimiter.extend_from_slice(boundary.as_bytes());

        // Position just past the first delimiter; no delimiter means no parts.
        let (pos, done) = match memmem::find(body, &delimiter) {
            Some(at) => (at + delimiter.len(), false),
            None => (0, true),
        };
        Self {
            body,
            delimiter,
            pos,
            done,
        }
    }
}

impl<'a> Iterator for MultipartParts<'a> {
    type Item = UploadPart<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let body: &'a [u8] = self.body;
        let rest = &body[self.pos..];
        if rest.starts_with(b"--") {
            self.done = true;
            return None;
        }
        let rest = rest.strip_prefix(CRLF).unwrap_or(rest);
        let consumed = body.len() - self.pos - rest.len();

        let Some(header_end) = memmem::find(rest, HEADER_END) else {
            self.done = true;
            return None;
        };
        let content_start = header_end + HEADER_END.len();
        let Some(content_len) = memmem::find(&rest[content_start..], &self.delimiter) else {
            tracing::debug!("Multipart part without closing boundary, stopping");
            self.done = true;
            return None;
        };

        let headers = &rest[..header_end];
        let mut content = &rest[content_start..content_start + content_len];
        if let Some(trimmed) = content.strip_suffix(CRLF) {
            content = trimmed;
        }

        self.pos += consumed + content_start + content_len + self.delimiter.len();
        Some(UploadPart {
            filename: disposition_filename(headers),
            content,
        })
    }
}

/// `filename` attribute of the part's `Content-Disposition` header.
fn disposition_filename(headers: &[u8]) -> Option<&str> {
    let headers = std::str::from_utf8(headers).ok()?;
    for line in headers.split("\r\n") {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if !name.trim().eq_ignore_ascii_case("content-disposition") {
            continue;
        }
        for param in split_params(value) {
            let param = param.trim();
            if let Some((key, v)) = param.split_once('=') {
                if key.trim().eq_ignore_ascii_case("filename") {
                    return Some(unquote(v));
                }
            }
        }
    }
    None
}

/// Write every named part under `uploads_dir`. Returns the number saved.
pub fn save_parts<'a>(
    parts: impl Iterator<Item = UploadPart<'a>>,
    uploads_dir: &Path,
) -> Result<usize, UploadError> {
    let mut saved = 0;
    for part in parts {
        let Some(raw) = part.filename else {
            continue;
        };
        let Some(name) = sanitize_file_name(raw) else {
            tracing::debug!(filename = %raw, "Skipping part with unusable filename");
            continue;
        };
        fs::create_dir_all(uploads_dir)?;
        let target: PathBuf = uploads_dir.join(name);
        fs::write(&target, part.content)?;
        metrics::record_upload_saved();
        tracing::info!(file = %target.display(), bytes = part.content.len(), "Upload saved");
        saved += 1;
    }
    Ok(saved)
}

/// Handle a `multipart/form-data` POST.
pub fn handle(req: &ParsedRequest, uploads_dir: &Path) -> Response {
    let boundary = match req.content_type().map(parse_boundary) {
        Some(Ok(boundary)) => boundary,
        _ => {
            tracing::debug!(path = %req.path, "Multipart request without boundary");
            return Response::error(StatusCode::BadRequest);
        }
    };

    match save_parts(MultipartParts::new(&req.body, boundary), uploads_dir) {
        Ok(saved) => {
            tracing::debug!(saved, "Multipart scan complete");
            Response::ok().with_bytes(CONFIRMATION.to_vec(), "text/plain")
        }
        Err(e) => {
            tracing::error!(error = %e, dir = %uploads_dir.display(), "Upload failed");
            Response::error(StatusCode::InternalServerError)
        }
    }
}
