//! # Configuration
//!
//! Operator-level settings loaded from environment variables.
//!
//! Settings are read once at startup and handed to every component through the
//! shared `Services` container; nothing reads the environment after that.

mod operator;

pub use operator::{OperatorConfig, VcsSettings};
