use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::orchestrator::OrchestratorConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub builder: BuilderToolConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("packsmith.db")
}

/// Workspace (temporary build directory) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkspaceConfig {
    /// Root directory under which per-job workspaces are created.
    #[serde(default = "default_workspace_root")]
    pub root: PathBuf,

    /// Grace period before a finished job's workspace is deleted, in seconds.
    /// Consumers may still be streaming files out of the workspace right
    /// after the build returns, so deletion is deferred rather than immediate.
    #[serde(default = "default_cleanup_grace_secs")]
    pub cleanup_grace_secs: u64,

    /// Grace period before an assembled archive file is deleted, in seconds.
    /// Archives outlive workspaces so a client polling a finished job still
    /// has a window to download the result.
    #[serde(default = "default_archive_grace_secs")]
    pub archive_grace_secs: u64,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_workspace_root(),
            cleanup_grace_secs: default_cleanup_grace_secs(),
            archive_grace_secs: default_archive_grace_secs(),
        }
    }
}

fn default_workspace_root() -> PathBuf {
    std::env::temp_dir().join("packsmith")
}

fn default_cleanup_grace_secs() -> u64 {
    600 // 10 minutes
}

fn default_archive_grace_secs() -> u64 {
    86_400 // 24 hours
}

/// External builder toolchain configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuilderToolConfig {
    /// Path to the TWA builder CLI.
    #[serde(default = "default_builder_path")]
    pub builder_path: PathBuf,

    /// Path to the JDK keytool binary used to create new signing keys.
    #[serde(default = "default_keytool_path")]
    pub keytool_path: PathBuf,

    /// Maximum wall-clock time for one builder invocation, in seconds.
    #[serde(default = "default_build_timeout")]
    pub timeout_secs: u64,

    /// Timeout for fetching a single remote asset (icon, manifest), in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Base URL of the safe-URL proxy used by the asset fetch fallback.
    #[serde(default = "default_proxy_base_url")]
    pub proxy_base_url: String,

    /// Extra arguments appended to every builder invocation.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for BuilderToolConfig {
    fn default() -> Self {
        Self {
            builder_path: default_builder_path(),
            keytool_path: default_keytool_path(),
            timeout_secs: default_build_timeout(),
            fetch_timeout_secs: default_fetch_timeout(),
            proxy_base_url: default_proxy_base_url(),
            extra_args: Vec::new(),
        }
    }
}

fn default_builder_path() -> PathBuf {
    PathBuf::from("bubblewrap")
}

fn default_keytool_path() -> PathBuf {
    PathBuf::from("keytool")
}

fn default_build_timeout() -> u64 {
    600 // 10 minutes
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_proxy_base_url() -> String {
    "https://safe-url.packsmith.dev/fetch".to_string()
}

/// Sanitized config for API responses
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub workspace: WorkspaceConfig,
    pub builder: SanitizedBuilderToolConfig,
    pub orchestrator: OrchestratorConfig,
}

/// Sanitized builder config (local toolchain paths hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedBuilderToolConfig {
    pub builder_configured: bool,
    pub timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    pub proxy_base_url: String,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            workspace: config.workspace.clone(),
            builder: SanitizedBuilderToolConfig {
                builder_configured: !config.builder.builder_path.as_os_str().is_empty(),
                timeout_secs: config.builder.timeout_secs,
                fetch_timeout_secs: config.builder.fetch_timeout_secs,
                proxy_base_url: config.builder.proxy_base_url.clone(),
            },
            orchestrator: config.orchestrator.clone(),
        }
    }
}
