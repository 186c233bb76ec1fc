//! Middleware module - message transforms and ordered chains.
//!
//! Provides:
//! - [`Middleware`] - a unary transform over message bytes
//! - [`MiddlewareChain`] - ordered, append-only, short-circuits on error
//! - [`log_preview`] - bundled stage that logs a bounded preview
//!
//! # Example
//!
//! ```ignore
//! use bytes::Bytes;
//! use framewire::middleware::{from_fn, map_fn, MiddlewareChain};
//!
//! let mut chain = MiddlewareChain::new();
//!
//! // Synchronous stage
//! chain.push(map_fn(|msg: Bytes| Ok(Bytes::from(msg.to_ascii_uppercase()))));
//!
//! // Asynchronous stage
//! chain.push(from_fn(|msg: Bytes| async move {
//!     tokio::task::yield_now().await;
//!     Ok(msg)
//! }));
//!
//! let out = chain.run(Bytes::from_static(b"hello")).await?;
//! ```

mod chain;
mod preview;

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

use bytes::Bytes;

use crate::error::BoxError;

pub use chain::MiddlewareChain;
pub use preview::{log_preview, LogPreview};

/// Result of a single middleware stage.
pub type MiddlewareResult = std::result::Result<Bytes, BoxError>;

/// Boxed future for middleware results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A transform applied to a message.
///
/// A stage receives the previous stage's output and returns the bytes for
/// the next one. Returning an error stops the chain.
pub trait Middleware: Send + Sync + 'static {
    /// Transform a message.
    fn call(&self, message: Bytes) -> BoxFuture<'static, MiddlewareResult>;
}

/// Adapter for async closures.
pub struct FnMiddleware<F, Fut>
where
    F: Fn(Bytes) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MiddlewareResult> + Send + 'static,
{
    f: F,
    _phantom: PhantomData<fn() -> Fut>,
}

impl<F, Fut> Middleware for FnMiddleware<F, Fut>
where
    F: Fn(Bytes) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MiddlewareResult> + Send + 'static,
{
    fn call(&self, message: Bytes) -> BoxFuture<'static, MiddlewareResult> {
        Box::pin((self.f)(message))
    }
}

/// Adapter for synchronous closures.
pub struct MapMiddleware<F>
where
    F: Fn(Bytes) -> MiddlewareResult + Send + Sync + 'static,
{
    f: F,
}

impl<F> Middleware for MapMiddleware<F>
where
    F: Fn(Bytes) -> MiddlewareResult + Send + Sync + 'static,
{
    fn call(&self, message: Bytes) -> BoxFuture<'static, MiddlewareResult> {
        let result = (self.f)(message);
        Box::pin(async move { result })
    }
}

/// Wrap an async closure as a middleware stage.
pub fn from_fn<F, Fut>(f: F) -> FnMiddleware<F, Fut>
where
    F: Fn(Bytes) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MiddlewareResult> + Send + 'static,
{
    FnMiddleware {
        f,
        _phantom: PhantomData,
    }
}

/// Wrap a synchronous closure as a middleware stage.
pub fn map_fn<F>(f: F) -> MapMiddleware<F>
where
    F: Fn(Bytes) -> MiddlewareResult + Send + Sync + 'static,
{
    MapMiddleware { f }
}
