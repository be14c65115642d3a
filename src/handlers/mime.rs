//! Extension to MIME type table.

use std::path::Path;

const FALLBACK: &str = "application/octet-stream";

/// Content type for `path`, chosen by its extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return FALLBACK;
    };
    match ext.to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "txt" => "text/plain",
        "pdf" => "application/pdf",
        _ => FALLBACK,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown_extensions() {
        assert_eq!(content_type_for(Path::new("/www/index.html")), "text/html");
        assert_eq!(content_type_for(Path::new("photo.JPEG")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("archive.tar.gz")), FALLBACK);
        assert_eq!(content_type_for(Path::new("Makefile")), FALLBACK);
    }
}
