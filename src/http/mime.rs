//! MIME type detection module
//!
//! Infers a Content-Type from an asset name's extension.

use std::path::Path;

/// Get MIME Content-Type for a logical asset name
///
/// # Examples
/// ```
/// use hare::http::mime::content_type_for;
/// assert_eq!(content_type_for("/index.html"), "text/html; charset=utf-8");
/// assert_eq!(content_type_for("/favicon.ico"), "image/x-icon");
/// assert_eq!(content_type_for("/LICENSE"), "application/octet-stream");
/// ```
pub fn content_type_for(name: &str) -> &'static str {
    let extension = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        // Text
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("txt" | "md") => "text/plain; charset=utf-8",
        Some("xml") => "text/xml; charset=utf-8",
        Some("csv") => "text/csv; charset=utf-8",

        // Scripts and data
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("wasm") => "application/wasm",

        // Images
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",

        // Documents
        Some("pdf") => "application/pdf",

        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_types() {
        assert_eq!(content_type_for("a.html"), "text/html; charset=utf-8");
        assert_eq!(content_type_for("style.css"), "text/css; charset=utf-8");
        assert_eq!(content_type_for("/robots.txt"), "text/plain; charset=utf-8");
        assert_eq!(content_type_for("/favicon.svg"), "image/svg+xml");
        assert_eq!(content_type_for("app.json"), "application/json");
    }

    #[test]
    fn test_extension_case_insensitive() {
        assert_eq!(content_type_for("LOGO.PNG"), "image/png");
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(content_type_for("data.xyz"), "application/octet-stream");
        assert_eq!(content_type_for("/Makefile"), "application/octet-stream");
    }
}
