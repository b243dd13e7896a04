//! # Runtime
//!
//! Process wiring around the reconcilers.
//!
//! - `initialization.rs` - tracing, metrics, HTTP server and client setup
//! - `watch_loop.rs` - one controller per owned kind
//! - `error_policy.rs` - requeue decisions for failed reconciles

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

pub use initialization::{initialize, init_tracing, InitializationResult};
pub use watch_loop::run_controllers;
