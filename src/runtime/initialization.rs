//! # Initialization
//!
//! Operator startup: rustls setup, tracing, metrics, HTTP server and the
//! Kubernetes client the controllers run on.

use crate::config::OperatorConfig;
use crate::controller::{Context, Services};
use crate::observability::{self, start_server, ServerState};
use anyhow::{Context as _, Result};
use kube::Client;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Everything the watch loop needs
pub struct InitializationResult {
    pub client: Client,
    pub context: Arc<Context>,
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field(
                "server_ready",
                &self
                    .server_state
                    .is_ready
                    .load(std::sync::atomic::Ordering::Relaxed),
            )
            .finish_non_exhaustive()
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `LOG_LEVEL`; `LOG_FORMAT=text` switches from JSON to
/// human readable output.
pub fn init_tracing(config: &OperatorConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "codebase_operator={}",
            config.log_level.to_lowercase()
        ))
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.log_format.eq_ignore_ascii_case("text") {
        builder.try_init()
    } else {
        builder.json().try_init()
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))
}

/// Initialize the operator runtime
pub async fn initialize(config: OperatorConfig) -> Result<InitializationResult> {
    // Must run before any rustls connection is made
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    init_tracing(&config)?;

    info!("Starting Codebase Operator v{}", env!("CARGO_PKG_VERSION"));
    info!(
        working_dir = %config.working_dir.display(),
        watch_namespace = config.watch_namespace.as_deref().unwrap_or("*"),
        vcs_integration = config.vcs.integration_enabled,
        "Configuration loaded"
    );

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let server_port = config.metrics_port;
    let server_state_clone = Arc::clone(&server_state);
    tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let context = Arc::new(Context::new(Services::kube(&client, config)));

    server_state
        .is_ready
        .store(true, std::sync::atomic::Ordering::Relaxed);
    info!("Operator initialized, starting controllers...");

    Ok(InitializationResult {
        client,
        context,
        server_state,
    })
}
