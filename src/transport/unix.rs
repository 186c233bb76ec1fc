//! Unix Domain Socket acceptor.

use std::path::{Path, PathBuf};

use tokio::net::{UnixListener, UnixStream};

use super::Acceptor;
use crate::error::Result;
use crate::middleware::BoxFuture;

/// Accepts connections on a Unix Domain Socket.
///
/// The socket file is removed when the acceptor is dropped.
#[derive(Debug)]
pub struct UnixAcceptor {
    listener: UnixListener,
    path: PathBuf,
}

impl UnixAcceptor {
    /// Bind to a socket path, replacing any stale socket file.
    pub async fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            std::fs::remove_file(path)?;
        }

        let listener = UnixListener::bind(path)?;

        Ok(Self {
            listener,
            path: path.to_path_buf(),
        })
    }

    /// The socket path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for UnixAcceptor {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

impl Acceptor for UnixAcceptor {
    type Stream = UnixStream;

    fn accept(&self) -> BoxFuture<'_, Result<(UnixStream, String)>> {
        Box::pin(async move {
            let (stream, _addr) = self.listener.accept().await?;
            // Unix peers are usually unnamed; label by the listening path.
            Ok((stream, format!("unix:{}", self.path.display())))
        })
    }

    fn local_description(&self) -> String {
        format!("unix:{}", self.path.display())
    }
}
