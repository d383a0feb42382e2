use std::fmt;

use crate::http::request::Version;
use crate::http::wire::WireRequest;

/// Upper bound on the request line plus header block.
pub const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Upper bound on a request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    InvalidRequest,
    InvalidMethod,
    InvalidVersion,
    InvalidHeader,
    InvalidContentLength,
    UnsupportedTransferEncoding,
    HeaderTooLarge,
    BodyTooLarge,
    Incomplete,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ParseError::InvalidRequest => "malformed request line",
            ParseError::InvalidMethod => "invalid method token",
            ParseError::InvalidVersion => "unsupported HTTP version",
            ParseError::InvalidHeader => "malformed header field",
            ParseError::InvalidContentLength => "invalid Content-Length",
            ParseError::UnsupportedTransferEncoding => "Transfer-Encoding is not supported",
            ParseError::HeaderTooLarge => "header block too large",
            ParseError::BodyTooLarge => "body too large",
            ParseError::Incomplete => "incomplete request",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for ParseError {}

/// Parses one request from the front of `buf`.
///
/// On success returns the request and the number of bytes it occupied, so
/// the caller can drop exactly that much from its buffer. Returns
/// `ParseError::Incomplete` when more bytes are needed.
pub fn parse_http_request(buf: &[u8]) -> Result<(WireRequest, usize), ParseError> {
    // Look for header/body separator
    let headers_end = match find_headers_end(buf) {
        Some(end) if end + 4 > MAX_HEADER_BYTES => return Err(ParseError::HeaderTooLarge),
        Some(end) => end,
        None if buf.len() >= MAX_HEADER_BYTES => return Err(ParseError::HeaderTooLarge),
        None => return Err(ParseError::Incomplete),
    };
    let header_bytes = &buf[..headers_end];
    let body_bytes = &buf[headers_end + 4..];

    let mut lines = header_bytes
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line));

    // Request line
    let request_line = lines.next().ok_or(ParseError::InvalidRequest)?;
    let request_line =
        std::str::from_utf8(request_line).map_err(|_| ParseError::InvalidRequest)?;
    let mut parts = request_line.split(' ');

    let method = parts.next().ok_or(ParseError::InvalidRequest)?;
    let target = parts.next().ok_or(ParseError::InvalidRequest)?;
    let version = parts.next().ok_or(ParseError::InvalidRequest)?;
    if parts.next().is_some() || target.is_empty() {
        return Err(ParseError::InvalidRequest);
    }

    if !is_token(method.as_bytes()) {
        return Err(ParseError::InvalidMethod);
    }
    let version = Version::parse(version).ok_or(ParseError::InvalidVersion)?;

    // Headers
    let mut headers = Vec::new();
    let mut content_length: Option<usize> = None;

    for line in lines {
        if line.is_empty() {
            continue;
        }

        let colon = line
            .iter()
            .position(|&b| b == b':')
            .ok_or(ParseError::InvalidHeader)?;
        let (key, value) = (&line[..colon], &line[colon + 1..]);
        if !is_token(key) {
            return Err(ParseError::InvalidHeader);
        }
        // Token bytes are ASCII.
        let key = String::from_utf8_lossy(key).into_owned();
        // Values may carry obs-text, which is not necessarily UTF-8.
        let value = String::from_utf8_lossy(value.trim_ascii()).into_owned();

        if key.eq_ignore_ascii_case("Transfer-Encoding") {
            return Err(ParseError::UnsupportedTransferEncoding);
        }
        if key.eq_ignore_ascii_case("Content-Length") {
            let len = value
                .parse::<usize>()
                .map_err(|_| ParseError::InvalidContentLength)?;
            if content_length.is_some_and(|prev| prev != len) {
                return Err(ParseError::InvalidContentLength);
            }
            content_length = Some(len);
        }

        headers.push((key, value));
    }

    // Body
    let content_length = content_length.unwrap_or(0);
    if content_length > MAX_BODY_BYTES {
        return Err(ParseError::BodyTooLarge);
    }
    if body_bytes.len() < content_length {
        return Err(ParseError::Incomplete);
    }

    let request = WireRequest {
        method: method.to_string(),
        target: target.to_string(),
        version,
        headers,
        body: body_bytes[..content_length].to_vec(),
    };

    let total_consumed = headers_end + 4 + content_length;
    Ok((request, total_consumed))
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|w| w == b"\r\n\r\n")
}

fn is_token(s: &[u8]) -> bool {
    !s.is_empty()
        && s.iter().all(|&b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}
