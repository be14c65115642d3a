//! Diagnostic body echo.

use crate::http::request::ParsedRequest;
use crate::http::response::Response;

/// Return the request body verbatim. An absent `Content-Type` echoes as plain text.
pub fn echo(req: &ParsedRequest) -> Response {
    let content_type = req.content_type().unwrap_or("text/plain").to_string();
    Response::ok().with_bytes(req.body.clone(), &content_type)
}
