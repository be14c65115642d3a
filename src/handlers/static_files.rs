//! Static file delivery and removal.

use std::fs::{self, File};

use crate::handlers::mime;
use crate::http::response::{Response, StatusCode};
use crate::security::path::{PathResolver, ResolveError};

/// Serve the file at `path`. HEAD gets identical headers and no body.
pub fn serve(resolver: &PathResolver, path: &str, is_head: bool) -> Response {
    let resolved = match resolver.resolve(path) {
        Ok(resolved) => resolved,
        Err(e) => return not_found(path, e),
    };

    let file = match File::open(&resolved) {
        Ok(file) => file,
        Err(e) => {
            tracing::debug!(path = %path, error = %e, "Open failed after resolution");
            return Response::error(StatusCode::NotFound);
        }
    };
    let len = match file.metadata() {
        Ok(meta) => meta.len(),
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "Stat failed on open file");
            return Response::error(StatusCode::NotFound);
        }
    };

    let response =
        Response::ok().with_file(file, len, mime::content_type_for(resolved.as_path()));
    if is_head {
        response.without_body()
    } else {
        response
    }
}

/// Remove the file at `path`: `200` with an empty body, otherwise `404`.
pub fn delete(resolver: &PathResolver, path: &str) -> Response {
    let resolved = match resolver.resolve(path) {
        Ok(resolved) => resolved,
        Err(e) => return not_found(path, e),
    };

    match fs::remove_file(&resolved) {
        Ok(()) => {
            tracing::info!(path = %resolved.as_path().display(), "File deleted");
            Response::ok().with_empty_body()
        }
        Err(e) => {
            tracing::debug!(path = %path, error = %e, "Delete failed");
            Response::error(StatusCode::NotFound)
        }
    }
}

fn not_found(path: &str, reason: ResolveError) -> Response {
    tracing::debug!(path = %path, reason = %reason, "Resolution failed");
    Response::error(StatusCode::NotFound)
}
