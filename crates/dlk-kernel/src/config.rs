use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use dlk_webapi::WebApiConfig;
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, KernelResult};
use crate::retry::RetryPolicy;

pub const ENV_MODE: &str = "DATALAB_KERNEL_MODE";
pub const ENV_WORKSPACE_URL: &str = "DATALAB_WORKSPACE_URL";
pub const ENV_WORKSPACE_TOKEN: &str = "DATALAB_WORKSPACE_TOKEN";
pub const ENV_PROXY_ADDR: &str = "DATALAB_PROXY_ADDR";

pub const DEFAULT_PROXY_ADDR: &str = "127.0.0.1:8765";

/// Requested backend selection policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelMode {
    /// Try remote backends, fall back to the local store.
    #[default]
    Auto,
    /// Always use the local store.
    Standalone,
    /// Require a remote backend; fail construction otherwise.
    Live,
}

impl KernelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Standalone => "standalone",
            Self::Live => "live",
        }
    }
}

impl fmt::Display for KernelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KernelMode {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "standalone" => Ok(Self::Standalone),
            "live" => Ok(Self::Live),
            other => Err(KernelError::Config(format!(
                "unknown kernel mode '{other}' (expected auto, standalone or live)"
            ))),
        }
    }
}

/// Kernel settings.
///
/// Built from defaults, an optional TOML file, then the `DATALAB_*`
/// environment variables; later sources win. Empty environment values
/// count as unset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub mode: KernelMode,
    /// Base URL of the web API; enables the web API backend.
    pub workspace_url: Option<String>,
    pub workspace_token: Option<String>,
    /// Address of the RPC channel.
    pub proxy_addr: String,
    pub connect_timeout_ms: u64,
    pub retry_attempts: u32,
    pub retry_interval_ms: u64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            mode: KernelMode::Auto,
            workspace_url: None,
            workspace_token: None,
            proxy_addr: DEFAULT_PROXY_ADDR.to_string(),
            connect_timeout_ms: 2_000,
            retry_attempts: RetryPolicy::DEFAULT_ATTEMPTS,
            retry_interval_ms: RetryPolicy::DEFAULT_INTERVAL.as_millis() as u64,
        }
    }
}

impl KernelConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> KernelResult<Self> {
        Self::default().with_env(|key| std::env::var(key).ok())
    }

    /// A TOML file overridden by the process environment.
    pub fn load(path: &Path) -> KernelResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| KernelError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)?.with_env(|key| std::env::var(key).ok())
    }

    pub fn from_toml_str(text: &str) -> KernelResult<Self> {
        toml::from_str(text).map_err(|e| KernelError::Config(e.to_string()))
    }

    /// Apply environment overrides read through `lookup`.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> KernelResult<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(mode) = var(ENV_MODE) {
            self.mode = mode.parse()?;
        }
        if let Some(url) = var(ENV_WORKSPACE_URL) {
            self.workspace_url = Some(url);
        }
        if let Some(token) = var(ENV_WORKSPACE_TOKEN) {
            self.workspace_token = Some(token);
        }
        if let Some(addr) = var(ENV_PROXY_ADDR) {
            self.proxy_addr = addr;
        }
        Ok(self)
    }

    pub fn with_mode(mut self, mode: KernelMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_workspace_url(mut self, url: impl Into<String>, token: Option<String>) -> Self {
        self.workspace_url = Some(url.into());
        self.workspace_token = token;
        self
    }

    pub fn with_proxy_addr(mut self, addr: impl Into<String>) -> Self {
        self.proxy_addr = addr.into();
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, Duration::from_millis(self.retry_interval_ms))
    }

    /// Web API parameters, when a URL is configured.
    pub fn web_api(&self) -> Option<WebApiConfig> {
        self.workspace_url.as_ref().filter(|u| !u.is_empty()).map(|url| {
            WebApiConfig::new(url.clone())
                .with_token(self.workspace_token.clone())
                .with_timeout(self.connect_timeout())
        })
    }
}
