//! # Handler Chains
//!
//! A chain is a fixed, ordered list of handlers assembled once by a factory.
//! Each handler performs one idempotent external mutation. The first error
//! halts the chain and nothing after it runs in that pass.
//!
//! Failure recording happens here rather than in every handler: a failed
//! handler's action and error text are written onto the resource status
//! before the error is returned, a transient error records a pending status
//! instead.

use crate::crd::{ActionType, StatusTracking};
use async_trait::async_trait;
use std::fmt;
use tracing::{debug, info, warn};

/// Outcome of a single handler other than success
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// A dependency is not ready yet, retry after a short fixed delay
    #[error("{0}")]
    Unavailable(String),

    /// A downstream object from an earlier pass is still waiting to be consumed
    #[error("{0}")]
    NotYetProcessed(String),

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(anyhow::anyhow!(message.into()))
    }
}

/// Outcome of a chain other than success
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("{action}: {reason}")]
    Transient { action: ActionType, reason: String },

    #[error("{action}: {reason}")]
    NotYetProcessed { action: ActionType, reason: String },

    #[error("{handler} failed: {source:#}")]
    Failed {
        handler: &'static str,
        action: ActionType,
        #[source]
        source: anyhow::Error,
    },
}

impl ChainError {
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::NotYetProcessed { .. })
    }
}

/// One step of a chain
#[async_trait]
pub trait Handler<R>: Send + Sync {
    fn name(&self) -> &'static str;

    /// Action recorded on the resource status for this step
    fn action(&self) -> ActionType;

    async fn serve(&self, resource: &mut R) -> Result<(), HandlerError>;
}

/// Ordered handler sequence traversed by index
pub struct Chain<R> {
    name: &'static str,
    handlers: Vec<Box<dyn Handler<R>>>,
}

impl<R> fmt::Debug for Chain<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("name", &self.name)
            .field("handlers", &self.handler_names())
            .finish()
    }
}

impl<R> Chain<R> {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handlers: Vec::new(),
        }
    }

    /// Append a handler; handlers run in the order they were added
    #[must_use]
    pub fn then(mut self, handler: impl Handler<R> + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<R: StatusTracking + Send + Sync> Chain<R> {
    /// Run every handler in order.
    ///
    /// Returns the action of the last handler that ran, `None` for an empty chain.
    pub async fn serve(&self, resource: &mut R) -> Result<Option<ActionType>, ChainError> {
        let mut last = None;

        for (position, handler) in self.handlers.iter().enumerate() {
            debug!(chain = %self.name, position, handler = handler.name(), "Serving handler");

            match handler.serve(resource).await {
                Ok(()) => last = Some(handler.action()),
                Err(HandlerError::Unavailable(reason)) => {
                    info!(chain = %self.name, handler = handler.name(), reason = %reason, "Dependency unavailable, postponing");
                    resource.record_pending(handler.action(), reason.clone());
                    return Err(ChainError::Transient {
                        action: handler.action(),
                        reason,
                    });
                }
                Err(HandlerError::NotYetProcessed(reason)) => {
                    info!(chain = %self.name, handler = handler.name(), reason = %reason, "Previous request not processed yet");
                    resource.record_pending(handler.action(), reason.clone());
                    return Err(ChainError::NotYetProcessed {
                        action: handler.action(),
                        reason,
                    });
                }
                Err(HandlerError::Failed(source)) => {
                    warn!(chain = %self.name, handler = handler.name(), error = %format!("{source:#}"), "Handler failed");
                    resource.record_failure(handler.action(), format!("{source:#}"));
                    return Err(ChainError::Failed {
                        handler: handler.name(),
                        action: handler.action(),
                        source,
                    });
                }
            }
        }

        Ok(last)
    }
}

/// Creation and deletion chains of one resource flavor
#[derive(Debug)]
pub struct ChainPair<R> {
    pub create: Chain<R>,
    pub delete: Chain<R>,
}
