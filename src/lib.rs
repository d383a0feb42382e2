//! catnap - a small asynchronous HTTP/1.1 static file server
//!
//! Core library for the listener, connection and static file handling.

pub mod config;
pub mod handler;
pub mod http;
pub mod server;
