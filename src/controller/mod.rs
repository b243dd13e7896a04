//! # Controller
//!
//! Reconciliation of the operator's resource kinds.
//!
//! - `chain`: ordered handler chains and their error classes
//! - `reconciler`: the generic pass shared by codebases and branches
//! - `status`: status writes with full-object fallback
//! - `versions`: branch version history
//! - `codebase`, `branch`, `image_stream`: handlers and chain factories per kind
//! - `context`: collaborators and prebuilt chains handed to every pass

pub mod branch;
pub mod chain;
pub mod codebase;
pub mod context;
pub mod error;
pub mod image_stream;
pub mod reconciler;
pub mod status;
pub mod versions;

pub use chain::{Chain, ChainError, ChainPair, Handler, HandlerError};
pub use context::{Context, Services};
pub use error::{ReconcilerError, StatusError};
pub use image_stream::reconcile_image_stream;
pub use reconciler::{reconcile, Reconcilable};
