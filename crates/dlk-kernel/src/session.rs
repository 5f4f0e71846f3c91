use std::sync::Arc;

use tracing::info;

use crate::config::KernelConfig;
use crate::connector::Connector;
use crate::error::KernelResult;
use crate::workspace::Workspace;

pub const KERNEL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// One interactive session: owns the workspace handed to the notebook
/// namespace.
#[derive(Debug)]
pub struct Session {
    workspace: Workspace,
}

impl Session {
    /// Discover a backend from the process environment and start.
    pub fn from_env() -> KernelResult<Self> {
        Self::start(KernelConfig::from_env()?)
    }

    pub fn start(config: KernelConfig) -> KernelResult<Self> {
        Ok(Self::with_workspace(Workspace::discover(config)?))
    }

    pub fn start_with(config: KernelConfig, connector: Arc<dyn Connector>) -> KernelResult<Self> {
        Ok(Self::with_workspace(Workspace::discover_with(config, connector)?))
    }

    pub fn with_workspace(workspace: Workspace) -> Self {
        let session = Self { workspace };
        info!("{}", session.banner());
        session
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn into_workspace(self) -> Workspace {
        self.workspace
    }

    pub fn banner(&self) -> String {
        format!(
            "DataLab kernel {KERNEL_VERSION} started in {} mode",
            self.workspace.mode()
        )
    }
}
