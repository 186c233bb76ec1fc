//! Connection session: one duplex stream, one read→classify→transform→write
//! cycle per call.
//!
//! The [`SessionBuilder`] provides a fluent API for configuring delimiters,
//! classifiers and middleware before wrapping a stream. The [`Session`]
//! owns the stream for its whole lifetime:
//!
//! ```text
//! Idle ─► Reading ─► Classified ─► Transforming ─► Writing ─► Idle
//!   └────────┴──────────┴─────────────┴──────────────┴──► Closed
//! ```
//!
//! Read and write failures close the session. A middleware failure aborts
//! only the current cycle and leaves the session usable.
//!
//! # Framing direction
//!
//! Every message is framed with the *request* delimiter, whatever it is
//! later classified as. The response delimiter is kept for callers but has
//! no effect on framing.
//!
//! # Example
//!
//! ```ignore
//! use framewire::{classify, middleware::map_fn, Session};
//!
//! let mut session = Session::builder()
//!     .request_delimiter(&b"\n"[..])
//!     .is_request(classify::first_three_zero)
//!     .is_response(classify::http_response)
//!     .request_middleware(map_fn(|msg| Ok(msg)))
//!     .build(stream);
//!
//! loop {
//!     let cycle = session.run_one_cycle().await?;
//!     if cycle.is_end_of_stream() {
//!         break;
//!     }
//! }
//! session.close().await?;
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::classify::{self, Category, Classifier, ClassifierPair};
use crate::config::SessionConfig;
use crate::error::{FramewireError, Result};
use crate::framing::{Boundary, FrameReader, DEFAULT_READ_CHUNK_SIZE};
use crate::middleware::{log_preview, Middleware, MiddlewareChain};
use crate::pipeline::Pipeline;

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(1);

fn next_label() -> String {
    format!("session-{}", SESSION_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Where a session is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the next cycle.
    Idle,
    /// Framing a message.
    Reading,
    /// Message framed and classified.
    Classified,
    /// Running a middleware chain.
    Transforming,
    /// Writing the result back.
    Writing,
    /// Terminal; the transport failed or was closed.
    Closed,
}

/// Outcome of one successful cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cycle {
    /// Category the message was routed to.
    pub category: Category,
    /// What ended the framed message.
    pub boundary: Boundary,
    /// Length of the framed message.
    pub bytes_read: usize,
    /// Length of the message written back.
    pub bytes_written: usize,
}

impl Cycle {
    /// Whether the peer reached end of stream during this cycle.
    ///
    /// No further messages can arrive once this is true.
    pub fn is_end_of_stream(&self) -> bool {
        self.boundary == Boundary::EndOfStream
    }
}

/// Builder for configuring and creating a [`Session`].
///
/// Delimiters and classifiers are fixed once the session is built;
/// middleware can still be appended afterwards.
pub struct SessionBuilder {
    request_delimiter: Bytes,
    response_delimiter: Bytes,
    is_request: Arc<dyn Classifier>,
    is_response: Arc<dyn Classifier>,
    read_chunk_size: usize,
    label: Option<String>,
    request: MiddlewareChain,
    response: MiddlewareChain,
}

impl SessionBuilder {
    /// Create a builder with defaults: no delimiters, `first_three_zero` /
    /// `http_response` classifiers, 256-byte reads, empty chains.
    pub fn new() -> Self {
        Self {
            request_delimiter: Bytes::new(),
            response_delimiter: Bytes::new(),
            is_request: Arc::new(classify::first_three_zero),
            is_response: Arc::new(classify::http_response),
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            label: None,
            request: MiddlewareChain::new(),
            response: MiddlewareChain::new(),
        }
    }

    /// Create a builder from a loaded configuration.
    ///
    /// When `log_preview_bytes` is set, each chain starts with a
    /// [`log_preview`] stage.
    pub fn from_config(config: &SessionConfig) -> Self {
        let mut builder = Self::new()
            .request_delimiter(Bytes::copy_from_slice(&config.request_delimiter))
            .response_delimiter(Bytes::copy_from_slice(&config.response_delimiter))
            .read_chunk_size(config.read_chunk_size);
        builder.is_request = config.request_classifier.classifier();
        builder.is_response = config.response_classifier.classifier();

        if let Some(n) = config.log_preview_bytes {
            builder = builder
                .request_middleware(log_preview("request", n))
                .response_middleware(log_preview("response", n));
        }
        builder
    }

    /// Delimiter used to frame every message. Empty disables it.
    pub fn request_delimiter(mut self, delimiter: impl Into<Bytes>) -> Self {
        self.request_delimiter = delimiter.into();
        self
    }

    /// Response-direction delimiter (not used for framing).
    pub fn response_delimiter(mut self, delimiter: impl Into<Bytes>) -> Self {
        self.response_delimiter = delimiter.into();
        self
    }

    /// Predicate selecting the request chain.
    pub fn is_request(mut self, classifier: impl Classifier) -> Self {
        self.is_request = Arc::new(classifier);
        self
    }

    /// Predicate selecting the response chain.
    pub fn is_response(mut self, classifier: impl Classifier) -> Self {
        self.is_response = Arc::new(classifier);
        self
    }

    /// Use an existing classifier pair.
    pub fn classifiers(mut self, pair: ClassifierPair) -> Self {
        let (is_request, is_response) = pair.into_parts();
        self.is_request = is_request;
        self.is_response = is_response;
        self
    }

    /// Size of each incremental read (at least 1).
    ///
    /// Default: 256
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size;
        self
    }

    /// Name attached to this session's log events.
    ///
    /// Default: `session-<n>`
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Append a stage to the request chain.
    pub fn request_middleware(mut self, stage: impl Middleware) -> Self {
        self.request.push(stage);
        self
    }

    /// Append a stage to the response chain.
    pub fn response_middleware(mut self, stage: impl Middleware) -> Self {
        self.response.push(stage);
        self
    }

    /// Wrap a stream in a session.
    pub fn build<S>(self, stream: S) -> Session<S>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let classifiers = ClassifierPair::from_shared(self.is_request, self.is_response);
        Session {
            stream,
            reader: FrameReader::with_chunk_size(self.request_delimiter, self.read_chunk_size),
            response_delimiter: self.response_delimiter,
            pipeline: Pipeline::with_chains(classifiers, self.request, self.response),
            state: SessionState::Idle,
            label: self.label.unwrap_or_else(next_label),
        }
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A live connection driving framing and dispatch cycles.
pub struct Session<S> {
    stream: S,
    reader: FrameReader,
    response_delimiter: Bytes,
    pipeline: Pipeline,
    state: SessionState,
    label: String,
}

impl Session<()> {
    /// Create a new session builder.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a session from a stream, two delimiters and two classifiers.
    pub fn new(
        stream: S,
        request_delimiter: impl Into<Bytes>,
        response_delimiter: impl Into<Bytes>,
        is_request: impl Classifier,
        is_response: impl Classifier,
    ) -> Self {
        SessionBuilder::new()
            .request_delimiter(request_delimiter)
            .response_delimiter(response_delimiter)
            .is_request(is_request)
            .is_response(is_response)
            .build(stream)
    }

    /// Append a stage to the request chain.
    pub fn add_request_middleware(&mut self, stage: impl Middleware) {
        self.pipeline.add_request_middleware(stage);
    }

    /// Append a stage to the response chain.
    pub fn add_response_middleware(&mut self, stage: impl Middleware) {
        self.pipeline.add_response_middleware(stage);
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the session has reached its terminal state.
    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// Label used in log events.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Delimiter used for framing.
    pub fn request_delimiter(&self) -> &[u8] {
        self.reader.delimiter()
    }

    /// Response-direction delimiter.
    pub fn response_delimiter(&self) -> &[u8] {
        &self.response_delimiter
    }

    /// Read one message, classify it, run its chain and write the result back.
    ///
    /// # Errors
    ///
    /// - [`FramewireError::Read`] / [`FramewireError::Write`]: the session is
    ///   now closed.
    /// - [`FramewireError::Middleware`]: nothing was written; the session is
    ///   idle and can run another cycle.
    /// - [`FramewireError::ConnectionClosed`]: the session was already closed.
    pub async fn run_one_cycle(&mut self) -> Result<Cycle> {
        if self.state == SessionState::Closed {
            return Err(FramewireError::ConnectionClosed);
        }

        self.state = SessionState::Reading;
        let frame = match self.reader.read(&mut self.stream).await {
            Ok(frame) => frame,
            Err(e) => {
                self.state = SessionState::Closed;
                tracing::debug!(session = %self.label, "read failed: {}", e);
                return Err(e);
            }
        };
        let boundary = frame.boundary;
        let bytes_read = frame.len();

        let category = self.pipeline.classify(&frame.bytes);
        self.state = SessionState::Classified;
        tracing::debug!(
            session = %self.label,
            %category,
            ?boundary,
            len = bytes_read,
            "message framed"
        );

        self.state = SessionState::Transforming;
        let message = match self.pipeline.transform(category, frame.bytes).await {
            Ok(message) => message,
            Err(e) => {
                self.state = SessionState::Idle;
                tracing::debug!(session = %self.label, %category, "middleware rejected message: {}", e);
                return Err(e);
            }
        };

        self.state = SessionState::Writing;
        if let Err(e) = self.write_message(&message).await {
            self.state = SessionState::Closed;
            tracing::debug!(session = %self.label, "write failed: {}", e);
            return Err(FramewireError::Write(e));
        }

        self.state = SessionState::Idle;
        Ok(Cycle {
            category,
            boundary,
            bytes_read,
            bytes_written: message.len(),
        })
    }

    async fn write_message(&mut self, message: &[u8]) -> std::io::Result<()> {
        self.stream.write_all(message).await?;
        self.stream.flush().await
    }

    /// Shut down the underlying stream.
    ///
    /// The session is closed afterwards even if shutdown fails. Calling this
    /// twice is only safe if the stream tolerates a second shutdown.
    pub async fn close(&mut self) -> Result<()> {
        self.state = SessionState::Closed;
        self.stream.shutdown().await?;
        Ok(())
    }
}

impl<S> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("label", &self.label)
            .field("state", &self.state)
            .field("reader", &self.reader)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::map_fn;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{duplex, AsyncReadExt, DuplexStream, ReadBuf};

    /// Stream whose reads and writes fail on demand.
    struct Faulty {
        inner: DuplexStream,
        fail_reads: bool,
        fail_writes: bool,
    }

    impl AsyncRead for Faulty {
        fn poll_read(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            if self.fail_reads {
                return Poll::Ready(Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "read reset",
                )));
            }
            Pin::new(&mut self.inner).poll_read(cx, buf)
        }
    }

    impl AsyncWrite for Faulty {
        fn poll_write(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            if self.fail_writes {
                return Poll::Ready(Err(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "write broken",
                )));
            }
            Pin::new(&mut self.inner).poll_write(cx, buf)
        }

        fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Pin::new(&mut self.inner).poll_flush(cx)
        }

        fn poll_shutdown(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
        ) -> Poll<std::io::Result<()>> {
            Pin::new(&mut self.inner).poll_shutdown(cx)
        }
    }

    fn upper() -> impl Middleware {
        map_fn(|msg: Bytes| Ok(Bytes::from(msg.to_ascii_uppercase())))
    }

    #[tokio::test]
    async fn test_echo_cycle_with_delimiter() {
        let (mut peer, stream) = duplex(4096);
        let mut session = Session::new(
            stream,
            &b"##"[..],
            &b""[..],
            classify::never,
            classify::never,
        );

        peer.write_all(b"foo##").await.unwrap();
        let cycle = session.run_one_cycle().await.unwrap();

        assert_eq!(cycle.category, Category::None);
        assert_eq!(cycle.boundary, Boundary::Delimiter);
        assert_eq!(cycle.bytes_read, 5);
        assert_eq!(session.state(), SessionState::Idle);

        let mut out = [0u8; 5];
        peer.read_exact(&mut out).await.unwrap();
        assert_eq!(&out, b"foo##");
    }

    #[tokio::test]
    async fn test_request_chain_transforms() {
        let (mut peer, stream) = duplex(4096);
        let mut session = Session::builder()
            .request_delimiter(&b"\n"[..])
            .is_request(|msg: &[u8]| msg.starts_with(b"req"))
            .request_middleware(upper())
            .build(stream);

        peer.write_all(b"req hello\n").await.unwrap();
        let cycle = session.run_one_cycle().await.unwrap();
        assert_eq!(cycle.category, Category::Request);

        let mut out = vec![0u8; cycle.bytes_written];
        peer.read_exact(&mut out).await.unwrap();
        assert_eq!(&out, b"REQ HELLO\n");
    }

    #[tokio::test]
    async fn test_response_chain_does_not_run_request_chain() {
        let (mut peer, stream) = duplex(4096);
        let mut session = Session::builder()
            .request_middleware(map_fn(|_msg: Bytes| Err("request chain ran".into())))
            .response_middleware(upper())
            .build(stream);

        let msg = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok";
        peer.write_all(msg).await.unwrap();
        let cycle = session.run_one_cycle().await.unwrap();

        assert_eq!(cycle.category, Category::Response);
        assert_eq!(cycle.boundary, Boundary::DeclaredLength);
        let mut out = vec![0u8; msg.len()];
        peer.read_exact(&mut out).await.unwrap();
        assert_eq!(out, msg.to_ascii_uppercase());
    }

    #[tokio::test]
    async fn test_frames_with_request_delimiter_only() {
        let (mut peer, stream) = duplex(4096);
        let mut session = Session::new(
            stream,
            &b"##"[..],
            &b"$$"[..],
            classify::never,
            classify::http_response,
        );
        assert_eq!(session.response_delimiter(), b"$$");

        // A response ending in the response delimiter is not framed by it.
        peer.write_all(b"HTTP/1.1 200 OK$$").await.unwrap();
        peer.write_all(b"more##").await.unwrap();

        let cycle = session.run_one_cycle().await.unwrap();
        assert_eq!(cycle.boundary, Boundary::Delimiter);
        assert_eq!(cycle.bytes_read, b"HTTP/1.1 200 OK$$more##".len());
    }

    #[tokio::test]
    async fn test_multiple_cycles_then_eof() {
        let (mut peer, stream) = duplex(4096);
        let mut session = Session::builder()
            .request_delimiter(&b"\n"[..])
            .build(stream);

        peer.write_all(b"one\n").await.unwrap();
        assert_eq!(session.run_one_cycle().await.unwrap().bytes_read, 4);
        peer.write_all(b"two\n").await.unwrap();
        assert_eq!(session.run_one_cycle().await.unwrap().bytes_read, 4);

        peer.shutdown().await.unwrap();
        let cycle = session.run_one_cycle().await.unwrap();
        assert!(cycle.is_end_of_stream());
        assert_eq!(cycle.bytes_read, 0);

        let mut echoed = vec![0u8; 8];
        peer.read_exact(&mut echoed).await.unwrap();
        assert_eq!(&echoed, b"one\ntwo\n");
    }

    #[tokio::test]
    async fn test_middleware_error_keeps_session_open() {
        let (mut peer, stream) = duplex(4096);
        let mut session = Session::builder()
            .request_delimiter(&b"\n"[..])
            .is_request(|msg: &[u8]| msg.starts_with(b"bad"))
            .request_middleware(map_fn(|_msg: Bytes| Err("rejected".into())))
            .build(stream);

        peer.write_all(b"bad\n").await.unwrap();
        let err = session.run_one_cycle().await.unwrap_err();
        assert!(matches!(err, FramewireError::Middleware(_)));
        assert!(!err.is_fatal());
        assert_eq!(session.state(), SessionState::Idle);

        peer.write_all(b"good\n").await.unwrap();
        let cycle = session.run_one_cycle().await.unwrap();
        assert_eq!(cycle.category, Category::None);

        // Only the second message was written back.
        let mut out = vec![0u8; 5];
        peer.read_exact(&mut out).await.unwrap();
        assert_eq!(&out, b"good\n");
    }

    #[tokio::test]
    async fn test_read_error_closes_session() {
        let (_peer, inner) = duplex(64);
        let stream = Faulty {
            inner,
            fail_reads: true,
            fail_writes: false,
        };
        let mut session = Session::builder().build(stream);

        let err = session.run_one_cycle().await.unwrap_err();
        assert!(matches!(err, FramewireError::Read(_)));
        assert!(session.is_closed());

        let err = session.run_one_cycle().await.unwrap_err();
        assert!(matches!(err, FramewireError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_write_error_closes_session() {
        let (mut peer, inner) = duplex(64);
        let stream = Faulty {
            inner,
            fail_reads: false,
            fail_writes: true,
        };
        let mut session = Session::builder()
            .request_delimiter(&b"!"[..])
            .build(stream);

        peer.write_all(b"hi!").await.unwrap();
        let err = session.run_one_cycle().await.unwrap_err();
        match err {
            FramewireError::Write(e) => assert_eq!(e.kind(), std::io::ErrorKind::BrokenPipe),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(session.is_closed());
    }

    #[tokio::test]
    async fn test_close_marks_closed() {
        let (mut peer, stream) = duplex(64);
        let mut session = Session::builder().label("test-conn").build(stream);
        assert_eq!(session.label(), "test-conn");

        session.close().await.unwrap();
        assert!(session.is_closed());

        // Peer sees end of stream.
        let mut buf = Vec::new();
        assert_eq!(peer.read_to_end(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_middleware_added_after_build() {
        let (mut peer, stream) = duplex(4096);
        let mut session = Session::builder()
            .request_delimiter(&b";"[..])
            .build(stream);
        session.add_request_middleware(upper());
        session.add_response_middleware(map_fn(|_msg: Bytes| Err("unused".into())));

        peer.write_all(b"\x00\x00\x00abc;").await.unwrap();
        let cycle = session.run_one_cycle().await.unwrap();
        assert_eq!(cycle.category, Category::Request);

        let mut out = vec![0u8; 7];
        peer.read_exact(&mut out).await.unwrap();
        assert_eq!(&out, b"\x00\x00\x00ABC;");
    }

    #[tokio::test]
    async fn test_from_config() {
        let config = SessionConfig::from_json_str(
            r#"{"request_delimiter": "\n", "response_classifier": "never", "log_preview_bytes": 4}"#,
        )
        .unwrap();
        let (mut peer, stream) = duplex(4096);
        let mut session = SessionBuilder::from_config(&config).build(stream);
        assert_eq!(session.request_delimiter(), b"\n");

        peer.write_all(b"HTTP/1.1 200 OK\n").await.unwrap();
        let cycle = session.run_one_cycle().await.unwrap();
        assert_eq!(cycle.category, Category::None);
    }

    #[tokio::test]
    async fn test_from_config_binary_delimiter() {
        let config = SessionConfig::from_json_str(r#"{"request_delimiter": [255, 254]}"#).unwrap();
        let (mut peer, stream) = duplex(4096);
        let mut session = SessionBuilder::from_config(&config).build(stream);
        assert_eq!(session.request_delimiter(), &[0xff, 0xfe]);

        peer.write_all(b"abc\xff\xfe").await.unwrap();
        let cycle = session.run_one_cycle().await.unwrap();
        assert_eq!(cycle.boundary, Boundary::Delimiter);
        assert_eq!(cycle.bytes_read, 5);

        let mut out = [0u8; 5];
        peer.read_exact(&mut out).await.unwrap();
        assert_eq!(&out, b"abc\xff\xfe");
    }

    #[test]
    fn test_default_labels_are_unique() {
        let (_a, s1) = duplex(8);
        let (_b, s2) = duplex(8);
        let first = Session::builder().build(s1);
        let second = Session::builder().build(s2);
        assert_ne!(first.label(), second.label());
        assert!(first.label().starts_with("session-"));
    }
}
