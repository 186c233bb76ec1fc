//! Observational middleware that logs a preview of each message.

use std::borrow::Cow;

use bytes::Bytes;

use super::{BoxFuture, Middleware, MiddlewareResult};

/// Logs message length and the first bytes, returning the message unchanged.
#[derive(Debug, Clone)]
pub struct LogPreview {
    prefix: String,
    max_preview_bytes: usize,
}

impl LogPreview {
    /// Label attached to every log event.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The (lossy UTF-8) preview that would be logged for `message`.
    pub fn preview<'a>(&self, message: &'a [u8]) -> Cow<'a, str> {
        let end = message.len().min(self.max_preview_bytes);
        String::from_utf8_lossy(&message[..end])
    }
}

impl Middleware for LogPreview {
    fn call(&self, message: Bytes) -> BoxFuture<'static, MiddlewareResult> {
        tracing::info!(
            prefix = %self.prefix,
            len = message.len(),
            preview = %self.preview(&message),
            "message"
        );
        Box::pin(async move { Ok(message) })
    }
}

/// Create a stage logging up to `max_preview_bytes` of every message.
pub fn log_preview(prefix: impl Into<String>, max_preview_bytes: usize) -> LogPreview {
    LogPreview {
        prefix: prefix.into(),
        max_preview_bytes,
    }
}
