//! Pipeline dispatcher: classify a framed message and run its chain.
//!
//! At most one chain runs per message. A message matching neither classifier
//! is passed through unchanged.

use bytes::Bytes;

use crate::classify::{Category, ClassifierPair};
use crate::error::{FramewireError, Result};
use crate::middleware::{Middleware, MiddlewareChain};

/// A message after dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    /// Category the message was classified as.
    pub category: Category,
    /// Output of the selected chain (or the input, for [`Category::None`]).
    pub message: Bytes,
}

/// Classifiers plus one middleware chain per direction.
#[derive(Debug, Default)]
pub struct Pipeline {
    classifiers: ClassifierPair,
    request: MiddlewareChain,
    response: MiddlewareChain,
}

impl Pipeline {
    /// Create a pipeline with empty chains.
    pub fn new(classifiers: ClassifierPair) -> Self {
        Self {
            classifiers,
            request: MiddlewareChain::new(),
            response: MiddlewareChain::new(),
        }
    }

    /// Create a pipeline with pre-built chains.
    pub fn with_chains(
        classifiers: ClassifierPair,
        request: MiddlewareChain,
        response: MiddlewareChain,
    ) -> Self {
        Self {
            classifiers,
            request,
            response,
        }
    }

    /// Append a stage to the request chain.
    pub fn add_request_middleware(&mut self, stage: impl Middleware) {
        self.request.push(stage);
    }

    /// Append a stage to the response chain.
    pub fn add_response_middleware(&mut self, stage: impl Middleware) {
        self.response.push(stage);
    }

    /// The active classifiers.
    pub fn classifiers(&self) -> &ClassifierPair {
        &self.classifiers
    }

    /// The chain that runs for `category`, if any.
    pub fn chain(&self, category: Category) -> Option<&MiddlewareChain> {
        match category {
            Category::Request => Some(&self.request),
            Category::Response => Some(&self.response),
            Category::None => None,
        }
    }

    /// Classify a message. Requests take precedence over responses.
    pub fn classify(&self, message: &[u8]) -> Category {
        self.classifiers.classify(message)
    }

    /// Run the chain for an already classified message.
    ///
    /// # Errors
    ///
    /// Returns [`FramewireError::Middleware`] carrying the failing stage's
    /// error; later stages are skipped.
    pub async fn transform(&self, category: Category, message: Bytes) -> Result<Bytes> {
        match self.chain(category) {
            Some(chain) => chain.run(message).await.map_err(FramewireError::Middleware),
            None => Ok(message),
        }
    }

    /// Classify and transform a message.
    pub async fn dispatch(&self, message: Bytes) -> Result<Dispatched> {
        let category = self.classify(&message);
        let message = self.transform(category, message).await?;
        Ok(Dispatched { category, message })
    }
}
