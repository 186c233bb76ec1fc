//! Bundled response classifier.

const HTTP_VERSION_PREFIX: &[u8] = b"HTTP/";

/// Whether the message starts with `HTTP/`, i.e. looks like an HTTP status line.
///
/// Nothing past the prefix is parsed.
pub fn http_response(message: &[u8]) -> bool {
    message.starts_with(HTTP_VERSION_PREFIX)
}
