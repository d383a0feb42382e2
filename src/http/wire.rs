//! Wire-level messages and the adapters to and from the handler model.
//!
//! The parser produces a [`WireRequest`] that keeps header names exactly as
//! received. The writer consumes a [`WireResponse`]. Handlers only ever see
//! [`Request`] and [`Response`], whose header maps are case-insensitive.

use crate::http::headers::HeaderMap;
use crate::http::request::{Method, Request, Version};
use crate::http::response::{Body, Response, StatusCode};

/// Field that carries the protocol version on some wire stacks. It is
/// already represented by `version` and is not copied into the model.
const VERSION_FIELD: &str = "version";

/// A request exactly as parsed off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    pub method: String,
    pub target: String,
    pub version: Version,
    /// Header fields in arrival order, names unmodified
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// A response in the form handed to the writer.
#[derive(Debug)]
pub struct WireResponse {
    pub status: StatusCode,
    pub version: Version,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl From<WireRequest> for Request {
    fn from(wire: WireRequest) -> Self {
        let mut headers = HeaderMap::new();
        for (name, value) in wire.headers {
            if name.eq_ignore_ascii_case(VERSION_FIELD) {
                continue;
            }
            headers.insert(name, value);
        }

        Request {
            method: Method::from(wire.method.as_str()),
            target: wire.target,
            version: wire.version,
            headers,
            params: HeaderMap::new(),
            body: wire.body,
        }
    }
}

impl From<Request> for WireRequest {
    fn from(req: Request) -> Self {
        WireRequest {
            method: req.method.as_str().to_string(),
            target: req.target,
            version: req.version,
            headers: req.headers.into_iter().collect(),
            body: req.body,
        }
    }
}

impl From<Response> for WireResponse {
    fn from(res: Response) -> Self {
        WireResponse {
            status: res.status,
            version: res.version,
            headers: res.headers.into_iter().collect(),
            body: res.body,
        }
    }
}

impl From<WireResponse> for Response {
    fn from(wire: WireResponse) -> Self {
        Response {
            status: wire.status,
            version: wire.version,
            headers: wire.headers.into_iter().collect(),
            body: wire.body,
        }
    }
}
