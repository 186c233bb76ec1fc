//! Transport module - listeners producing duplex streams.
//!
//! Provides acceptors over:
//! - TCP sockets (all platforms)
//! - Unix Domain Sockets (Linux/macOS)
//!
//! Sessions only need `AsyncRead + AsyncWrite`; acceptors exist for the
//! bundled [`Server`](crate::server::Server).

mod tcp;
#[cfg(unix)]
mod unix;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;
use crate::middleware::BoxFuture;

pub use tcp::TcpAcceptor;
#[cfg(unix)]
pub use unix::UnixAcceptor;

/// A source of incoming connections.
pub trait Acceptor: Send + Sync + 'static {
    /// Connected stream type.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Wait for the next connection.
    ///
    /// Returns the stream and a printable peer description used as the
    /// session label.
    fn accept(&self) -> BoxFuture<'_, Result<(Self::Stream, String)>>;

    /// Printable local address.
    fn local_description(&self) -> String;
}
