//! # Codebase Operator
//!
//! Kubernetes operator driving the EDP delivery platform resources:
//!
//! 1. **Codebase** - provisions the VCS project and the Jenkins folder
//! 2. **CodebaseBranch** - triggers release jobs or pushes branches to git,
//!    then registers the branch image stream
//! 3. **CodebaseImageStream** - requests `CDStageDeploy` objects for labelled stages
//!
//! Configuration comes from environment variables (see `OperatorConfig`);
//! the flags below override the most common ones.

use anyhow::Result;
use clap::Parser;
use codebase_operator::config::OperatorConfig;
use codebase_operator::runtime::{initialize, run_controllers};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "codebase-operator", version, about = "EDP codebase operator")]
struct Args {
    /// Namespace to watch, all namespaces when unset
    #[arg(long, env = "WATCH_NAMESPACE")]
    namespace: Option<String>,

    /// Port of the metrics and probe server
    #[arg(long, env = "METRICS_PORT")]
    metrics_port: Option<u16>,

    /// Base directory for git working copies
    #[arg(long, env = "WORKING_DIR")]
    working_dir: Option<PathBuf>,
}

impl Args {
    fn apply(self, mut config: OperatorConfig) -> OperatorConfig {
        if let Some(namespace) = self.namespace.filter(|ns| !ns.trim().is_empty()) {
            config.watch_namespace = Some(namespace);
        }
        if let Some(port) = self.metrics_port {
            config.metrics_port = port;
        }
        if let Some(dir) = self.working_dir {
            config.working_dir = dir;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Args::parse().apply(OperatorConfig::from_env());

    let init = initialize(config).await?;
    run_controllers(init.client, init.context, init.server_state).await;

    info!("Operator stopped");
    Ok(())
}
