//! Static file handler.
//!
//! Maps a request target onto a file under the document root. Every outcome,
//! including bad input and filesystem errors, is turned into a response.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::http::mime;
use crate::http::request::{Method, Request};
use crate::http::response::{Body, Response, ResponseBuilder, StatusCode};

/// Value of the `Server` header on every response.
pub const SERVER_NAME: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

const INDEX_FILE: &str = "index.html";

/// The directory files are served from.
///
/// Set once at startup and shared read-only by every connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocRoot(Arc<str>);

impl DocRoot {
    pub fn new(root: impl AsRef<str>) -> Self {
        Self(Arc::from(root.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DocRoot {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for DocRoot {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Produces the response for one request.
pub fn handle_request(doc_root: &DocRoot, req: &Request) -> Response {
    if req.method != Method::GET && req.method != Method::HEAD {
        return bad_request(req, "Unknown HTTP-method");
    }

    // Request path must be absolute and not contain "..".
    if !req.target.starts_with('/') || req.target.contains("..") {
        return bad_request(req, "Illegal request-target");
    }

    let mut path = path_cat(doc_root.as_str(), &req.target);
    if req.target.ends_with('/') {
        path.push(INDEX_FILE);
    }

    let (file, size) = match open_file(&path) {
        Ok(opened) => opened,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return not_found(req),
        Err(e) => return server_error(req, &error_message(&e)),
    };

    let mut builder = ResponseBuilder::new(StatusCode::Ok)
        .version(req.version)
        .header("Server", SERVER_NAME)
        .header("Content-Type", mime::mime_type(&path))
        .header("Content-Length", size.to_string());

    // HEAD still opens the file so a missing or unreadable file is reported
    // the same way as for GET.
    if req.method == Method::GET {
        builder = builder.body(Body::File { file, len: size });
    }

    finish(builder, req)
}

/// Appends a request target to the document root using the host separator.
pub fn path_cat(base: &str, target: &str) -> PathBuf {
    if base.is_empty() {
        return PathBuf::from(target);
    }

    let separator = std::path::MAIN_SEPARATOR;
    let mut result = base.strip_suffix(separator).unwrap_or(base).to_string();
    if separator == '/' {
        result.push_str(target);
    } else {
        result.extend(target.chars().map(|c| if c == '/' { separator } else { c }));
    }
    PathBuf::from(result)
}

fn open_file(path: &Path) -> io::Result<(File, u64)> {
    let file = File::open(path)?;
    let metadata = file.metadata()?;
    if metadata.is_dir() {
        return Err(io::Error::other("Is a directory"));
    }
    Ok((file, metadata.len()))
}

/// The OS description of an I/O error, without the `(os error N)` suffix.
fn error_message(e: &io::Error) -> String {
    let msg = e.to_string();
    if let Some(code) = e.raw_os_error() {
        let suffix = format!(" (os error {code})");
        if let Some(text) = msg.strip_suffix(suffix.as_str()) {
            return text.to_string();
        }
    }
    msg
}

fn finish(builder: ResponseBuilder, req: &Request) -> Response {
    let mut response = builder.build();
    response.set_keep_alive(req.keep_alive());
    response
}

fn error_response(req: &Request, status: StatusCode, body: String) -> Response {
    let builder = ResponseBuilder::new(status)
        .version(req.version)
        .header("Server", SERVER_NAME)
        .header("Content-Type", "text/html")
        .body(body);
    finish(builder, req)
}

fn bad_request(req: &Request, why: &str) -> Response {
    error_response(req, StatusCode::BadRequest, why.to_string())
}

fn not_found(req: &Request) -> Response {
    error_response(
        req,
        StatusCode::NotFound,
        format!("The resource '{}' was not found.", req.target),
    )
}

fn server_error(req: &Request, what: &str) -> Response {
    error_response(
        req,
        StatusCode::InternalServerError,
        format!("An error occurred: '{what}'"),
    )
}
