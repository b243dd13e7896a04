//! # Observability
//!
//! - `metrics`: Prometheus metrics collection
//! - `server`: HTTP endpoints for metrics and probes

pub mod metrics;
pub mod server;

pub use server::{start_server, ServerState};
