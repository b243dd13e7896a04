//! # Reconcile Context
//!
//! Collaborators shared by every handler and the chains assembled from them.
//! Chains are built once when the context is created and selected per pass
//! by the codebase CI tool.

use crate::cluster::Stores;
use crate::config::OperatorConfig;
use crate::controller::chain::{Chain, ChainPair};
use crate::controller::{branch, codebase, image_stream};
use crate::crd::{CiTool, Codebase, CodebaseBranch, CodebaseImageStream};
use crate::git::{GitCli, GitOps};
use crate::jenkins::{ClusterJenkinsConnector, JenkinsConnector};
use crate::vcs::{ClusterVcsConnector, VcsConnector};
use kube::Client;
use std::sync::Arc;

/// External collaborators of the handlers
pub struct Services {
    pub stores: Stores,
    pub config: OperatorConfig,
    pub jenkins: Arc<dyn JenkinsConnector>,
    pub vcs: Arc<dyn VcsConnector>,
    pub git: Arc<dyn GitOps>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Services {
    /// Services talking to the cluster through `client`
    #[must_use]
    pub fn kube(client: &Client, config: OperatorConfig) -> Self {
        let stores = Stores::kube(client);
        let jenkins = Arc::new(ClusterJenkinsConnector::new(
            Arc::clone(&stores.jenkins),
            Arc::clone(&stores.secrets),
        ));
        let vcs = Arc::new(ClusterVcsConnector::new(
            config.vcs.clone(),
            Arc::clone(&stores.secrets),
        ));
        Self {
            stores,
            config,
            jenkins,
            vcs,
            git: Arc::new(GitCli),
        }
    }
}

/// Chain pairs of one kind for every CI tool
#[derive(Debug)]
pub struct ChainSet<R> {
    jenkins: ChainPair<R>,
    gitlab_ci: ChainPair<R>,
}

impl<R> ChainSet<R> {
    pub fn build(mut factory: impl FnMut(CiTool) -> ChainPair<R>) -> Self {
        Self {
            jenkins: factory(CiTool::Jenkins),
            gitlab_ci: factory(CiTool::GitlabCi),
        }
    }

    #[must_use]
    pub fn for_tool(&self, tool: CiTool) -> &ChainPair<R> {
        match tool {
            CiTool::Jenkins => &self.jenkins,
            CiTool::GitlabCi => &self.gitlab_ci,
        }
    }
}

/// Shared state handed to every reconcile pass
#[derive(Debug)]
pub struct Context {
    pub services: Arc<Services>,
    pub codebase_chains: ChainSet<Codebase>,
    pub branch_chains: ChainSet<CodebaseBranch>,
    pub image_stream_chain: Chain<CodebaseImageStream>,
}

impl Context {
    #[must_use]
    pub fn new(services: Services) -> Self {
        let services = Arc::new(services);
        Self {
            codebase_chains: ChainSet::build(|tool| codebase::chains(tool, &services)),
            branch_chains: ChainSet::build(|tool| branch::chains(tool, &services)),
            image_stream_chain: image_stream::chain(&services),
            services,
        }
    }
}
