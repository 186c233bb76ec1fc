//! TCP acceptor.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};

use super::Acceptor;
use crate::error::Result;
use crate::middleware::BoxFuture;

/// Accepts TCP connections.
#[derive(Debug)]
pub struct TcpAcceptor {
    listener: TcpListener,
}

impl TcpAcceptor {
    /// Bind to an address such as `127.0.0.1:9004` (`:0` picks a free port).
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    /// Wrap an already bound listener.
    pub fn from_listener(listener: TcpListener) -> Self {
        Self { listener }
    }

    /// The bound address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

impl Acceptor for TcpAcceptor {
    type Stream = TcpStream;

    fn accept(&self) -> BoxFuture<'_, Result<(TcpStream, String)>> {
        Box::pin(async move {
            let (stream, peer) = self.listener.accept().await?;
            Ok((stream, peer.to_string()))
        })
    }

    fn local_description(&self) -> String {
        match self.listener.local_addr() {
            Ok(addr) => addr.to_string(),
            Err(_) => "tcp:unknown".to_string(),
        }
    }
}
