//! Codebase Operator Library
//!
//! Reconciles `Codebase`, `CodebaseBranch` and `CodebaseImageStream`
//! resources against Jenkins, VCS hosting and git.
//!
//! Every resource kind runs a fixed chain of idempotent handlers built once
//! at startup. Tests live next to the code and under `tests/`.

pub mod cluster;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod git;
pub mod jenkins;
pub mod observability;
pub mod runtime;
pub mod vcs;
