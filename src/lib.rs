//! # framewire
//!
//! Message framing and middleware dispatch for duplex byte streams.
//!
//! A [`Session`] wraps one connection and turns its byte stream into
//! discrete messages. Each message is classified as a request, a response
//! or neither, passed through the matching middleware chain, and written
//! back on the same connection.
//!
//! ## Architecture
//!
//! - **Framing** ([`framing`]): declared length, delimiter, or end of stream
//! - **Classification** ([`classify`]): pluggable request/response predicates
//! - **Middleware** ([`middleware`]): ordered, short-circuiting transforms
//! - **Dispatch** ([`pipeline`]): classification plus chain selection
//! - **Session** ([`session`]): read → classify → transform → write
//!
//! [`server`] and [`transport`] provide an accept loop for running sessions
//! over TCP or Unix sockets; [`config`] loads options from JSON.
//!
//! ## Example
//!
//! ```ignore
//! use framewire::{classify, middleware::map_fn, Session};
//!
//! #[tokio::main]
//! async fn main() -> framewire::Result<()> {
//!     let stream = tokio::net::TcpStream::connect("127.0.0.1:9004").await?;
//!     let mut session = Session::builder()
//!         .request_delimiter(&b"\n"[..])
//!         .is_response(classify::http_response)
//!         .response_middleware(map_fn(|msg| Ok(msg)))
//!         .build(stream);
//!
//!     session.run_one_cycle().await?;
//!     session.close().await
//! }
//! ```

pub mod classify;
pub mod config;
pub mod error;
pub mod framing;
pub mod middleware;
pub mod pipeline;
pub mod server;
pub mod session;
pub mod transport;

pub use classify::{Category, Classifier, ClassifierPair};
pub use config::{ServerConfig, SessionConfig};
pub use error::{BoxError, FramewireError, Result};
pub use framing::{Boundary, Frame, FrameReader};
pub use middleware::{Middleware, MiddlewareChain};
pub use pipeline::{Dispatched, Pipeline};
pub use server::Server;
pub use session::{Cycle, Session, SessionBuilder, SessionState};
