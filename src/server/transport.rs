//! Stream and listener abstractions shared by the TCP and Unix transports.
//!
//! The session and accept loop are written once against these traits. The
//! transports only differ in addressing and in whether a graceful close
//! includes shutting down the write half.

use std::future::Future;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};

/// A connected, bidirectional byte stream.
pub trait Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static {
    /// Closes the outbound direction. Transports without half-close
    /// implement this as a no-op.
    fn half_close(&mut self) -> impl Future<Output = io::Result<()>> + Send;
}

/// A bound listener that yields connected streams.
pub trait Listener: Send + Sync + 'static {
    type Stream: Stream;

    /// Waits for the next connection. The second element is a printable
    /// peer address.
    fn accept(&self) -> impl Future<Output = io::Result<(Self::Stream, String)>> + Send;

    /// Printable form of the address this listener is bound to.
    fn local_endpoint(&self) -> String;
}

impl Stream for TcpStream {
    async fn half_close(&mut self) -> io::Result<()> {
        AsyncWriteExt::shutdown(self).await
    }
}

impl Listener for TcpListener {
    type Stream = TcpStream;

    async fn accept(&self) -> io::Result<(TcpStream, String)> {
        let (stream, peer) = TcpListener::accept(self).await?;
        Ok((stream, peer.to_string()))
    }

    fn local_endpoint(&self) -> String {
        match self.local_addr() {
            Ok(addr) => format!("tcp://{addr}"),
            Err(_) => "tcp://<unknown>".to_string(),
        }
    }
}

#[cfg(unix)]
impl Stream for UnixStream {
    async fn half_close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(unix)]
impl Listener for UnixListener {
    type Stream = UnixStream;

    async fn accept(&self) -> io::Result<(UnixStream, String)> {
        let (stream, peer) = UnixListener::accept(self).await?;
        let peer = match peer.as_pathname() {
            Some(path) => path.display().to_string(),
            None => "<unnamed>".to_string(),
        };
        Ok((stream, peer))
    }

    fn local_endpoint(&self) -> String {
        match self.local_addr().ok().and_then(|a| a.as_pathname().map(|p| p.to_owned())) {
            Some(path) => format!("unix://{}", path.display()),
            None => "unix://<unnamed>".to_string(),
        }
    }
}

#[cfg(test)]
impl Stream for tokio::io::DuplexStream {
    async fn half_close(&mut self) -> io::Result<()> {
        AsyncWriteExt::shutdown(self).await
    }
}
