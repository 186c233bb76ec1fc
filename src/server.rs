//! Server harness: accept connections and drive one session per connection.
//!
//! Each accepted stream gets its own tokio task running
//! [`serve_connection`]. There is no limit on concurrent connections and no
//! queueing; a stalled session only stalls its own task.
//!
//! On shutdown every session task is told to stop through a broadcast
//! channel, so idle connections do not hold the server open.
//!
//! # Example
//!
//! ```ignore
//! use framewire::config::SessionConfig;
//! use framewire::middleware::log_preview;
//! use framewire::server::Server;
//! use framewire::transport::TcpAcceptor;
//!
//! #[tokio::main]
//! async fn main() -> framewire::Result<()> {
//!     let acceptor = TcpAcceptor::bind("127.0.0.1:9004").await?;
//!     Server::new(acceptor, SessionConfig::default())
//!         .with_setup(|session| session.add_request_middleware(log_preview("req", 64)))
//!         .run(async { tokio::signal::ctrl_c().await.ok(); })
//!         .await
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::broadcast;
use tokio::task::JoinSet;

use crate::config::SessionConfig;
use crate::error::Result;
use crate::session::{Session, SessionBuilder};
use crate::transport::Acceptor;

/// Hook run on every new session before its first cycle.
pub type SessionSetup<S> = Arc<dyn Fn(&mut Session<S>) + Send + Sync>;

/// Accept loop spawning one task per connection.
pub struct Server<A: Acceptor> {
    acceptor: A,
    config: Arc<SessionConfig>,
    setup: Option<SessionSetup<A::Stream>>,
}

impl<A: Acceptor> Server<A> {
    /// Create a server applying `config` to every connection.
    pub fn new(acceptor: A, config: SessionConfig) -> Self {
        Self {
            acceptor,
            config: Arc::new(config),
            setup: None,
        }
    }

    /// Install a hook that adds middleware (or otherwise prepares) each session.
    pub fn with_setup<F>(mut self, setup: F) -> Self
    where
        F: Fn(&mut Session<A::Stream>) + Send + Sync + 'static,
    {
        self.setup = Some(Arc::new(setup));
        self
    }

    /// The underlying acceptor.
    pub fn acceptor(&self) -> &A {
        &self.acceptor
    }

    fn new_session(&self, stream: A::Stream, peer: String) -> Session<A::Stream> {
        let mut session = SessionBuilder::from_config(&self.config)
            .label(peer)
            .build(stream);
        if let Some(setup) = &self.setup {
            setup(&mut session);
        }
        session
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// After shutdown no new connections are accepted and every session is
    /// asked to stop; the call returns once all session tasks have finished.
    /// Accept errors are logged and the loop keeps going.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let (stop_tx, _) = broadcast::channel::<()>(1);
        let mut sessions = JoinSet::new();
        tokio::pin!(shutdown);

        tracing::info!(addr = %self.acceptor.local_description(), "listening");

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.acceptor.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            tracing::info!(peer = %peer, "connection accepted");
                            let session = self.new_session(stream, peer);
                            sessions.spawn(serve_connection(session, stop_tx.subscribe()));
                        }
                        Err(e) => {
                            tracing::error!("accept failed: {}", e);
                        }
                    }
                }
            }

            while let Some(done) = sessions.try_join_next() {
                log_join(done);
            }
        }

        tracing::info!(active = sessions.len(), "shutting down, stopping sessions");
        // No receivers just means no sessions are running.
        let _ = stop_tx.send(());
        while let Some(done) = sessions.join_next().await {
            log_join(done);
        }
        Ok(())
    }
}

fn log_join(done: std::result::Result<Result<()>, tokio::task::JoinError>) {
    match done {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("session ended with error: {}", e),
        Err(e) => tracing::error!("session task failed: {}", e),
    }
}

/// Run cycles on a session until the peer finishes, the transport fails or
/// `stop` fires.
///
/// Middleware errors are logged and the session keeps going; read and write
/// errors end it. On end of stream or `stop` the stream is shut down. A stop
/// signal abandons the cycle in progress, including a partially read message.
/// A dropped sender counts as a stop signal.
pub async fn serve_connection<S>(
    mut session: Session<S>,
    mut stop: broadcast::Receiver<()>,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let outcome = tokio::select! {
            outcome = session.run_one_cycle() => Some(outcome),
            _ = stop.recv() => None,
        };
        let Some(outcome) = outcome else {
            tracing::debug!(session = %session.label(), "stop requested");
            break;
        };

        match outcome {
            Ok(cycle) if cycle.is_end_of_stream() => break,
            Ok(_) => {}
            Err(e) if !e.is_fatal() => {
                tracing::warn!(session = %session.label(), "cycle aborted: {}", e);
            }
            Err(e) => {
                tracing::warn!(session = %session.label(), "session closed: {}", e);
                return Err(e);
            }
        }
    }

    // The peer may already be gone; a failed shutdown is not worth reporting.
    if let Err(e) = session.close().await {
        tracing::debug!(session = %session.label(), "shutdown failed: {}", e);
    }
    tracing::debug!(session = %session.label(), "session finished");
    Ok(())
}
