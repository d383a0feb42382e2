use std::fmt;
use std::io;
use std::net::SocketAddr;
#[cfg(unix)]
use std::path::Path;

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tokio::net::TcpListener;
#[cfg(unix)]
use tokio::net::UnixListener;
use tracing::{error, info};

use crate::handler::DocRoot;
use crate::http::connection::Connection;
use crate::server::transport::Listener;

/// Pending-connection queue length passed to `listen(2)`.
const BACKLOG: i32 = 1024;

/// Failure to bring up a listener. Only that listener is affected.
#[derive(Debug)]
pub enum SetupError {
    /// A socket call failed; `op` names the step (`open`, `set_option`,
    /// `bind`, `listen`).
    Io { op: &'static str, source: io::Error },
    /// The requested kind of endpoint cannot be served.
    Unsupported(&'static str),
}

impl SetupError {
    fn io(op: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| SetupError::Io { op, source }
    }

    /// Name of the step that failed, if it was a socket call.
    pub fn op(&self) -> Option<&'static str> {
        match self {
            SetupError::Io { op, .. } => Some(op),
            SetupError::Unsupported(_) => None,
        }
    }
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupError::Io { op, source } => write!(f, "{op}: {source}"),
            SetupError::Unsupported(what) => f.write_str(what),
        }
    }
}

impl std::error::Error for SetupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SetupError::Io { source, .. } => Some(source),
            SetupError::Unsupported(_) => None,
        }
    }
}

/// Accepts connections on a bound listener and hands each one to its own
/// connection task.
pub struct Acceptor<L> {
    listener: L,
    doc_root: DocRoot,
}

/// Runs open, set-option, bind and listen, tagging failures with the step.
fn setup_socket(domain: Domain, protocol: Option<Protocol>, addr: &SockAddr) -> Result<Socket, SetupError> {
    let socket = Socket::new(domain, Type::STREAM, protocol).map_err(SetupError::io("open"))?;

    socket
        .set_reuse_address(true)
        .map_err(SetupError::io("set_option"))?;
    socket
        .set_nonblocking(true)
        .map_err(SetupError::io("set_option"))?;

    socket.bind(addr).map_err(SetupError::io("bind"))?;
    socket.listen(BACKLOG).map_err(SetupError::io("listen"))?;

    Ok(socket)
}

impl Acceptor<TcpListener> {
    /// Binds a TCP listener with address reuse enabled.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn bind_tcp(addr: SocketAddr, doc_root: DocRoot) -> Result<Self, SetupError> {
        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = setup_socket(domain, Some(Protocol::TCP), &addr.into())?;
        let std_listener: std::net::TcpListener = socket.into();
        let listener = TcpListener::from_std(std_listener).map_err(SetupError::io("listen"))?;

        Ok(Self { listener, doc_root })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

#[cfg(unix)]
impl Acceptor<UnixListener> {
    /// Binds a Unix-domain listener at `path`.
    ///
    /// Anonymous sockets are rejected before any socket is created.
    pub fn bind_unix(path: &Path, doc_root: DocRoot, anonymous: bool) -> Result<Self, SetupError> {
        if anonymous {
            return Err(SetupError::Unsupported(
                "anonymous unix sockets are not supported",
            ));
        }

        let addr = SockAddr::unix(path).map_err(SetupError::io("open"))?;
        let socket = setup_socket(Domain::UNIX, None, &addr)?;
        let std_listener: std::os::unix::net::UnixListener = socket.into();
        let listener = UnixListener::from_std(std_listener).map_err(SetupError::io("listen"))?;

        Ok(Self { listener, doc_root })
    }
}

impl<L: Listener> Acceptor<L> {
    pub fn local_endpoint(&self) -> String {
        self.listener.local_endpoint()
    }

    /// Accepts connections forever.
    ///
    /// A failed accept is logged and the loop carries on with the next one.
    pub async fn run(self) {
        info!("Listening on {}", self.listener.local_endpoint());

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    info!("Accepted connection from {}", peer);

                    let conn = Connection::new(stream, self.doc_root.clone(), peer);
                    tokio::spawn(conn.run());
                }
                Err(e) => {
                    error!(op = "accept", error = %e, "transport failure");
                }
            }
        }
    }
}
