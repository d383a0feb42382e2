//! HTTP protocol implementation.
//!
//! This module implements an HTTP/1.1 server with support for keep-alive connections.
//!
//! # Architecture
//!
//! The HTTP layer is organized into several submodules:
//!
//! - **`connection`**: The per-connection state machine
//! - **`parser`**: Parses incoming HTTP requests from byte buffers
//! - **`wire`**: Wire-level messages and their adapters to the handler model
//! - **`headers`**: Case-insensitive header and parameter maps
//! - **`request`**: HTTP request representation
//! - **`response`**: HTTP response representation with builder pattern
//! - **`writer`**: Serializes and writes HTTP responses to the client
//! - **`mime`**: MIME type detection based on file extensions
//!
//! # Connection State Machine
//!
//! Each client connection goes through a state machine:
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait for incoming request data
//!        └──────┬──────┘
//!               │ Request received          (EOF / error → Closing)
//!               ▼
//!        ┌──────────────────┐
//!        │   Dispatching    │ ← Static file handler builds the response
//!        └──────┬───────────┘
//!               │ Response ready
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Send response to client
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ Keep-Alive → Reading (same connection)
//!               └─ Close / error → Closing → Closed
//! ```
//!
//! # Example
//!
//! ```ignore
//! use catnap::handler::DocRoot;
//! use catnap::http::connection::Connection;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!     let doc_root = DocRoot::new("./public");
//!
//!     loop {
//!         let (socket, addr) = listener.accept().await?;
//!         let conn = Connection::new(socket, doc_root.clone(), addr.to_string());
//!         tokio::spawn(conn.run());
//!     }
//! }
//! ```

pub mod connection;
pub mod headers;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod wire;
pub mod writer;
