use std::mem;

use bytes::{Buf, BytesMut};
use tokio::io::AsyncReadExt;
use tracing::{debug, error};

use crate::handler::{self, DocRoot};
use crate::http::parser::{parse_http_request, ParseError};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::wire::{WireRequest, WireResponse};
use crate::http::writer::ResponseWriter;
use crate::server::transport::Stream;

const READ_CHUNK: usize = 4096;

/// One client connection and everything it owns.
///
/// The connection is driven by a single task, so at most one read or write
/// is ever pending on the stream and no locking is needed on its buffer.
pub struct Connection<S> {
    stream: S,
    buffer: BytesMut,
    doc_root: DocRoot,
    peer: String,
    state: ConnectionState,
}

pub enum ConnectionState {
    Reading,
    Dispatching(Request),
    Writing(Response),
    Closing,
    Closed,
}

impl<S: Stream> Connection<S> {
    pub fn new(stream: S, doc_root: DocRoot, peer: String) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            doc_root,
            peer,
            state: ConnectionState::Reading,
        }
    }

    /// Serves requests until the connection is closed.
    ///
    /// Transport failures are logged here and end only this connection.
    pub async fn run(mut self) {
        loop {
            self.state = match mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => match self.read_request().await {
                    Ok(Some(wire)) => ConnectionState::Dispatching(Request::from(wire)),
                    Ok(None) => {
                        debug!(peer = %self.peer, "peer closed connection");
                        ConnectionState::Closing
                    }
                    Err(e) => {
                        error!(op = "read", peer = %self.peer, error = %e, "transport failure");
                        ConnectionState::Closing
                    }
                },

                ConnectionState::Dispatching(req) => {
                    let response = handler::handle_request(&self.doc_root, &req);
                    debug!(
                        peer = %self.peer,
                        method = %req.method,
                        target = %req.target,
                        status = response.status.as_u16(),
                        "request handled"
                    );
                    ConnectionState::Writing(response)
                }

                ConnectionState::Writing(response) => {
                    let close = response.need_eof();
                    let writer = ResponseWriter::new(WireResponse::from(response));

                    match writer.write_to_stream(&mut self.stream).await {
                        Ok(()) if close => ConnectionState::Closing,
                        Ok(()) => ConnectionState::Reading,
                        Err(e) => {
                            error!(op = "write", peer = %self.peer, error = %e, "transport failure");
                            ConnectionState::Closing
                        }
                    }
                }

                ConnectionState::Closing => {
                    if let Err(e) = self.stream.half_close().await {
                        debug!(peer = %self.peer, error = %e, "shutdown failed");
                    }
                    ConnectionState::Closed
                }

                ConnectionState::Closed => break,
            };
        }
    }

    /// Reads until one full request is buffered.
    ///
    /// Returns `Ok(None)` when the peer closes cleanly between requests.
    pub async fn read_request(&mut self) -> anyhow::Result<Option<WireRequest>> {
        loop {
            // Try parsing whatever we already have
            match parse_http_request(&self.buffer) {
                Ok((request, consumed)) => {
                    // Remove consumed bytes
                    self.buffer.advance(consumed);
                    return Ok(Some(request));
                }

                Err(ParseError::Incomplete) => {
                    // Need more data → fall through to read
                }

                Err(e) => {
                    // Malformed request → protocol error
                    return Err(anyhow::anyhow!("HTTP parse error: {e}"));
                }
            }

            // Read more data
            self.buffer.reserve(READ_CHUNK);
            let n = self.stream.read_buf(&mut self.buffer).await?;

            if n == 0 {
                if self.buffer.is_empty() {
                    // Client closed connection
                    return Ok(None);
                }
                anyhow::bail!("connection closed mid-request");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    fn spawn_connection(root: &std::path::Path) -> DuplexStream {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let doc_root = DocRoot::new(root.to_str().unwrap());
        tokio::spawn(Connection::new(server, doc_root, "test".to_string()).run());
        client
    }

    /// Reads one response and returns its head and body.
    async fn read_response(client: &mut DuplexStream) -> (String, Vec<u8>) {
        let mut buf = Vec::new();
        let head_end = loop {
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            let mut chunk = [0u8; 1024];
            let n = client.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before response head");
            buf.extend_from_slice(&chunk[..n]);
        };
        let head = String::from_utf8(buf[..head_end].to_vec()).unwrap();
        let len: usize = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length: "))
            .unwrap()
            .parse()
            .unwrap();
        let mut body = buf[head_end..].to_vec();
        while body.len() < len {
            let mut chunk = [0u8; 1024];
            let n = client.read(&mut chunk).await.unwrap();
            assert!(n > 0);
            body.extend_from_slice(&chunk[..n]);
        }
        (head, body)
    }

    #[tokio::test]
    async fn serves_two_requests_on_one_connection() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "hi").unwrap();
        let mut client = spawn_connection(dir.path());

        for _ in 0..2 {
            client
                .write_all(b"GET / HTTP/1.1\r\nHost: test\r\n\r\n")
                .await
                .unwrap();
            let (head, body) = read_response(&mut client).await;
            assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
            assert!(head.contains("content-type: text/html\r\n"));
            assert_eq!(body, b"hi");
        }
    }

    #[tokio::test]
    async fn connection_close_ends_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut client = spawn_connection(dir.path());

        client
            .write_all(b"GET /missing.txt HTTP/1.1\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let (head, body) = read_response(&mut client).await;
        assert!(head.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(String::from_utf8(body).unwrap().contains("was not found"));

        // The server half-closed its side after the response.
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn http10_closes_without_keep_alive() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "abc").unwrap();
        let mut client = spawn_connection(dir.path());

        client
            .write_all(b"GET /a.txt HTTP/1.0\r\n\r\n")
            .await
            .unwrap();
        let (head, body) = read_response(&mut client).await;
        assert!(head.starts_with("HTTP/1.0 200 OK\r\n"));
        assert_eq!(body, b"abc");

        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn malformed_request_closes_without_response() {
        let dir = tempfile::tempdir().unwrap();
        let mut client = spawn_connection(dir.path());

        client.write_all(b"GET / HTTP/9.9\r\n\r\n").await.unwrap();

        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn latin1_header_value_still_gets_a_response() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "hi").unwrap();
        let mut client = spawn_connection(dir.path());

        client
            .write_all(b"GET / HTTP/1.1\r\nUser-Agent: caf\xe9\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let (head, body) = read_response(&mut client).await;
        assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
        assert_eq!(body, b"hi");
    }
}
