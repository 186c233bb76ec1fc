//! Classification of framed messages into requests and responses.
//!
//! A classifier is a pure predicate over the raw message bytes. Each session
//! holds one request classifier and one response classifier; they are checked
//! in that order and the first match decides the [`Category`].
//!
//! Any `Fn(&[u8]) -> bool` closure is a classifier:
//!
//! ```
//! use framewire::classify::{Category, ClassifierPair};
//!
//! let pair = ClassifierPair::new(
//!     |msg: &[u8]| msg.starts_with(b"REQ"),
//!     |msg: &[u8]| msg.starts_with(b"RES"),
//! );
//! assert_eq!(pair.classify(b"REQ 1"), Category::Request);
//! assert_eq!(pair.classify(b"???"), Category::None);
//! ```

mod request;
mod response;

use std::fmt;
use std::sync::Arc;

pub use request::first_three_zero;
pub use response::http_response;

/// A predicate deciding whether a message belongs to a category.
pub trait Classifier: Send + Sync + 'static {
    /// Check the raw message bytes.
    fn matches(&self, message: &[u8]) -> bool;
}

impl<F> Classifier for F
where
    F: Fn(&[u8]) -> bool + Send + Sync + 'static,
{
    #[inline]
    fn matches(&self, message: &[u8]) -> bool {
        self(message)
    }
}

/// Classifier that never matches.
///
/// Use it to disable one category entirely.
pub fn never(_message: &[u8]) -> bool {
    false
}

/// Which middleware chain a message is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Matched the request classifier.
    Request,
    /// Matched the response classifier (and not the request one).
    Response,
    /// Matched neither; passed through untouched.
    None,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Request => "request",
            Category::Response => "response",
            Category::None => "none",
        };
        f.write_str(name)
    }
}

/// The request/response classifiers active for a session.
///
/// Cheap to clone; the predicates are shared.
#[derive(Clone)]
pub struct ClassifierPair {
    is_request: Arc<dyn Classifier>,
    is_response: Arc<dyn Classifier>,
}

impl ClassifierPair {
    /// Create a pair from two classifiers.
    pub fn new(is_request: impl Classifier, is_response: impl Classifier) -> Self {
        Self {
            is_request: Arc::new(is_request),
            is_response: Arc::new(is_response),
        }
    }

    /// Create a pair from already shared classifiers.
    pub fn from_shared(is_request: Arc<dyn Classifier>, is_response: Arc<dyn Classifier>) -> Self {
        Self {
            is_request,
            is_response,
        }
    }

    /// Split into the request and response classifiers.
    pub fn into_parts(self) -> (Arc<dyn Classifier>, Arc<dyn Classifier>) {
        (self.is_request, self.is_response)
    }

    /// Whether the request classifier matches.
    pub fn is_request(&self, message: &[u8]) -> bool {
        self.is_request.matches(message)
    }

    /// Whether the response classifier matches.
    pub fn is_response(&self, message: &[u8]) -> bool {
        self.is_response.matches(message)
    }

    /// Assign a category. The request classifier is checked first.
    pub fn classify(&self, message: &[u8]) -> Category {
        if self.is_request(message) {
            Category::Request
        } else if self.is_response(message) {
            Category::Response
        } else {
            Category::None
        }
    }
}

impl Default for ClassifierPair {
    /// `first_three_zero` for requests, `http_response` for responses.
    fn default() -> Self {
        Self::new(first_three_zero, http_response)
    }
}

impl fmt::Debug for ClassifierPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierPair").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_checked_first() {
        let pair = ClassifierPair::new(|_: &[u8]| true, |_: &[u8]| true);
        assert_eq!(pair.classify(b"anything"), Category::Request);
    }

    #[test]
    fn test_response_when_not_request() {
        let pair = ClassifierPair::default();
        assert_eq!(pair.classify(b"HTTP/1.1 200 OK\r\n\r\n"), Category::Response);
    }

    #[test]
    fn test_none_when_neither() {
        let pair = ClassifierPair::default();
        assert_eq!(pair.classify(b"hello"), Category::None);
        assert_eq!(pair.classify(b""), Category::None);
    }

    #[test]
    fn test_default_request() {
        let pair = ClassifierPair::default();
        assert_eq!(pair.classify(&[0, 0, 0, 1]), Category::Request);
    }

    #[test]
    fn test_never() {
        let pair = ClassifierPair::new(never, never);
        assert_eq!(pair.classify(&[0, 0, 0]), Category::None);
        assert_eq!(pair.classify(b"HTTP/1.0 404"), Category::None);
    }

    #[test]
    fn test_category_display() {
        assert_eq!(Category::Request.to_string(), "request");
        assert_eq!(Category::Response.to_string(), "response");
        assert_eq!(Category::None.to_string(), "none");
    }
}
