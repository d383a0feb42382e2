//! Listener setup and the accept loop.

pub mod listener;
pub mod transport;

use tokio::task::JoinHandle;

use crate::config::Endpoint;
use crate::handler::DocRoot;

pub use listener::{Acceptor, SetupError};

/// Binds `endpoint` and starts accepting connections on a background task.
///
/// Setup failures are returned to the caller; once this returns `Ok` the
/// listener runs until the runtime shuts down.
pub fn listen(endpoint: &Endpoint, doc_root: DocRoot) -> Result<JoinHandle<()>, SetupError> {
    match endpoint {
        Endpoint::Tcp(addr) => {
            let acceptor = Acceptor::bind_tcp(*addr, doc_root)?;
            Ok(tokio::spawn(acceptor.run()))
        }
        #[cfg(unix)]
        Endpoint::Unix { path, anonymous } => {
            let acceptor = Acceptor::bind_unix(path, doc_root, *anonymous)?;
            Ok(tokio::spawn(acceptor.run()))
        }
        #[cfg(not(unix))]
        Endpoint::Unix { .. } => Err(SetupError::Unsupported(
            "unix sockets are not supported on this platform",
        )),
    }
}
