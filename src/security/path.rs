//! Document-root containment.
//!
//! # Responsibilities
//! - Map a request path onto the document root
//! - Canonicalize both sides (resolving `..` and symlinks) on every call
//! - Accept only regular files located under the canonical root
//!
//! # Design Decisions
//! - Nothing is cached: the filesystem may change between requests
//! - Escapes are reported as `Forbidden` internally but answered as `404`
//! - Comparison is per path component, so `/www2` is not inside `/www`

use std::fs;
use std::path::{Path, PathBuf};

/// Why a request path could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("not found")]
    NotFound,
    #[error("path escapes document root")]
    Forbidden,
}

/// A canonical path to a regular file under the document root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath(PathBuf);

impl ResolvedPath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Resolves request paths against a document root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    default_document: String,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>, default_document: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            default_document: default_document.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `request_path` (query already removed) to a file under the root.
    pub fn resolve(&self, request_path: &str) -> Result<ResolvedPath, ResolveError> {
        if !request_path.starts_with('/') {
            return Err(ResolveError::NotFound);
        }

        let mut relative = request_path.trim_start_matches('/').to_string();
        if relative.is_empty() || relative.ends_with('/') {
            relative.push_str(self.default_document.trim_start_matches('/'));
        }
        let candidate = self.root.join(relative);

        let canonical_root = self.root.canonicalize().map_err(|e| {
            tracing::error!(root = %self.root.display(), error = %e, "Document root unavailable");
            ResolveError::NotFound
        })?;
        let canonical = candidate
            .canonicalize()
            .map_err(|_| ResolveError::NotFound)?;

        if !canonical.starts_with(&canonical_root) {
            tracing::warn!(
                request_path = %request_path,
                resolved = %canonical.display(),
                "Rejected path outside document root"
            );
            return Err(ResolveError::Forbidden);
        }

        match fs::metadata(&canonical) {
            Ok(meta) if meta.is_file() => Ok(ResolvedPath(canonical)),
            _ => Err(ResolveError::NotFound),
        }
    }
}

/// Reduce a client-supplied upload name to a bare file name.
///
/// Returns `None` for names with no usable final component.
pub fn sanitize_file_name(name: &str) -> Option<&str> {
    let base = name.rsplit(&['/', '\\'][..]).next()?.trim();
    if base.is_empty() || base == "." || base == ".." || base.contains('\0') {
        return None;
    }
    Some(base)
}
