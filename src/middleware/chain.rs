//! Ordered middleware chain.

use std::fmt;

use bytes::Bytes;

use super::{Middleware, MiddlewareResult};

/// An append-only sequence of middleware stages.
///
/// Stages run in insertion order; an empty chain is the identity.
#[derive(Default)]
pub struct MiddlewareChain {
    stages: Vec<Box<dyn Middleware>>,
}

impl MiddlewareChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append a stage to the end of the chain.
    pub fn push(&mut self, stage: impl Middleware) {
        self.stages.push(Box::new(stage));
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the chain has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in order, feeding each the previous output.
    ///
    /// Stops at the first failing stage and returns its error as-is; later
    /// stages do not run.
    pub async fn run(&self, message: Bytes) -> MiddlewareResult {
        let mut message = message;
        for stage in &self.stages {
            message = stage.call(message).await?;
        }
        Ok(message)
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("stages", &self.stages.len())
            .finish()
    }
}
