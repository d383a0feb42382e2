use std::fs;

use catnap::config::Endpoint;
use catnap::handler::DocRoot;
use catnap::server::{self, Acceptor, SetupError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Reads one response and returns its head and body.
async fn read_response<S: AsyncRead + Unpin>(stream: &mut S) -> (String, Vec<u8>) {
    let mut buf = Vec::new();
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let mut chunk = [0u8; 1024];
        let n = stream.read(&mut chunk).await.unwrap();
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
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed mid-body");
        body.extend_from_slice(&chunk[..n]);
    }
    (head, body)
}

fn doc_root_with_index() -> (tempfile::TempDir, DocRoot) {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.html"), "hi").unwrap();
    let root = DocRoot::new(dir.path().to_str().unwrap());
    (dir, root)
}

#[tokio::test]
async fn test_tcp_keep_alive_serves_multiple_requests() {
    let (_dir, root) = doc_root_with_index();
    let acceptor = Acceptor::bind_tcp("127.0.0.1:0".parse().unwrap(), root).unwrap();
    let addr = acceptor.local_addr().unwrap();
    tokio::spawn(acceptor.run());

    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    let (head, body) = read_response(&mut stream).await;
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("content-type: text/html\r\n"));
    assert!(!head.contains("connection: close"));
    assert_eq!(body, b"hi");

    stream
        .write_all(b"DELETE /foo HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    let (head, body) = read_response(&mut stream).await;
    assert!(head.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(String::from_utf8(body).unwrap().contains("Unknown HTTP-method"));

    stream
        .write_all(b"GET /../etc/passwd HTTP/1.1\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let (head, body) = read_response(&mut stream).await;
    assert!(head.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(head.contains("connection: close\r\n"));
    assert!(String::from_utf8(body).unwrap().contains("Illegal request-target"));

    let mut rest = Vec::new();
    stream.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn test_tcp_head_request() {
    let (_dir, root) = doc_root_with_index();
    let acceptor = Acceptor::bind_tcp("127.0.0.1:0".parse().unwrap(), root).unwrap();
    let addr = acceptor.local_addr().unwrap();
    tokio::spawn(acceptor.run());

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"HEAD /index.html HTTP/1.1\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let text = String::from_utf8(raw).unwrap();
    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(text.contains("content-length: 2\r\n"));
    assert!(text.ends_with("\r\n\r\n"));
}

#[tokio::test]
async fn test_one_bad_connection_does_not_stop_the_listener() {
    let (_dir, root) = doc_root_with_index();
    let acceptor = Acceptor::bind_tcp("127.0.0.1:0".parse().unwrap(), root).unwrap();
    let addr = acceptor.local_addr().unwrap();
    tokio::spawn(acceptor.run());

    let mut bad = TcpStream::connect(addr).await.unwrap();
    bad.write_all(b"garbage\r\n\r\n").await.unwrap();
    let mut rest = Vec::new();
    bad.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());

    let mut good = TcpStream::connect(addr).await.unwrap();
    good.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();
    let (head, _) = read_response(&mut good).await;
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
}

#[tokio::test]
async fn test_tcp_non_utf8_header_value_is_served() {
    let (_dir, root) = doc_root_with_index();
    let acceptor = Acceptor::bind_tcp("127.0.0.1:0".parse().unwrap(), root).unwrap();
    let addr = acceptor.local_addr().unwrap();
    tokio::spawn(acceptor.run());

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET / HTTP/1.1\r\nUser-Agent: caf\xe9\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let (head, body) = read_response(&mut stream).await;
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("connection: close\r\n"));
    assert_eq!(body, b"hi");
}

#[tokio::test]
async fn test_listen_tcp_endpoint() {
    let (_dir, root) = doc_root_with_index();
    let handle = server::listen(&Endpoint::Tcp("127.0.0.1:0".parse().unwrap()), root).unwrap();
    assert!(!handle.is_finished());
    handle.abort();
}

#[cfg(unix)]
mod unix {
    use super::*;
    use tokio::net::UnixStream;

    #[tokio::test]
    async fn test_unix_keep_alive_serves_multiple_requests() {
        let (dir, root) = doc_root_with_index();
        let sock = dir.path().join("catnap.sock");
        let acceptor = Acceptor::bind_unix(&sock, root, false).unwrap();
        assert!(acceptor.local_endpoint().starts_with("unix://"));
        tokio::spawn(acceptor.run());

        let mut stream = UnixStream::connect(&sock).await.unwrap();
        for _ in 0..2 {
            stream.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();
            let (head, body) = read_response(&mut stream).await;
            assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
            assert_eq!(body, b"hi");
        }

        stream
            .write_all(b"GET /missing.txt HTTP/1.1\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let (head, body) = read_response(&mut stream).await;
        assert!(head.starts_with("HTTP/1.1 404 Not Found\r\n"));
        let body = String::from_utf8(body).unwrap();
        assert!(body.contains("missing.txt"));
        assert!(body.contains("was not found"));

        // No half-close on unix sockets; the server drops the stream instead.
        let mut rest = Vec::new();
        stream.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_unix_socket_is_unsupported() {
        let (dir, root) = doc_root_with_index();
        let sock = dir.path().join("anon.sock");

        let err = Acceptor::bind_unix(&sock, root, true).err().unwrap();

        assert!(matches!(err, SetupError::Unsupported(_)));
        assert!(err.to_string().contains("anonymous"));
        assert!(!sock.exists());
    }

    #[tokio::test]
    async fn test_bind_failure_reports_step() {
        let (dir, root) = doc_root_with_index();
        let sock = dir.path().join("taken.sock");
        let _first = Acceptor::bind_unix(&sock, root.clone(), false).unwrap();

        let err = Acceptor::bind_unix(&sock, root, false).err().unwrap();

        assert_eq!(err.op(), Some("bind"));
        assert!(err.to_string().starts_with("bind: "));
    }

    #[tokio::test]
    async fn test_listen_anonymous_endpoint_fails() {
        let (dir, root) = doc_root_with_index();
        let endpoint = Endpoint::Unix {
            path: dir.path().join("x.sock"),
            anonymous: true,
        };

        assert!(server::listen(&endpoint, root).is_err());
    }
}
