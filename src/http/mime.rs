//! MIME type detection module
//!
//! Returns the Content-Type for a served file based on its extension.

use std::path::Path;

/// Content type used when the extension is missing or not in the table.
pub const DEFAULT_CONTENT_TYPE: &str = "application/text";

/// Get the Content-Type for a file extension, ignoring case.
///
/// # Examples
/// ```
/// use catnap::http::mime::get_content_type;
/// assert_eq!(get_content_type(Some("HTML")), "text/html");
/// assert_eq!(get_content_type(Some("svgz")), "image/svg+xml");
/// assert_eq!(get_content_type(None), "application/text");
/// ```
pub fn get_content_type(extension: Option<&str>) -> &'static str {
    let ext = extension.map(str::to_ascii_lowercase);
    match ext.as_deref() {
        // Text
        Some("htm" | "html" | "php") => "text/html",
        Some("css") => "text/css",
        Some("txt") => "text/plain",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("xml") => "application/xml",

        // Media
        Some("swf") => "application/x-shockwave-flash",
        Some("flv") => "video/x-flv",

        // Images
        Some("png") => "image/png",
        Some("jpe" | "jpeg" | "jpg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("ico") => "image/vnd.microsoft.icon",
        Some("tiff" | "tif") => "image/tiff",
        Some("svg" | "svgz") => "image/svg+xml",

        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// Get the Content-Type for a filesystem path.
pub fn mime_type(path: &Path) -> &'static str {
    get_content_type(path.extension().and_then(|e| e.to_str()))
}
