//! Layered configuration.
//!
//! Resolution order, later layers winning:
//! 1. built-in defaults
//! 2. a TOML file (`--config` or `REPORTCARD_CONFIG`)
//! 3. `REPORTCARD_*` environment variables
//! 4. command-line flags, applied by the binary

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use reportcard_core::{GitRemote, RemoteRepository};
use reportcard_state::fakes::MemoryReportStore;
use reportcard_state::{
    FsReportStore, ReportStore, StateError, SurrealConfig, SurrealCredentials, SurrealReportStore,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::lint::{BuiltinLinter, LintSpec};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "REPORTCARD_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("invalid value for {key}: '{value}'")]
    Env { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceSettings {
    /// Directory under which workspaces are created.
    pub root: PathBuf,
    pub clone_timeout_secs: u64,
    pub clone_depth: u32,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            root: std::env::temp_dir().join("reportcard"),
            clone_timeout_secs: 15,
            clone_depth: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    pub scheme: String,
    /// Replaces `<scheme>://<host>` in remote URLs.
    pub mirror_base: Option<String>,
    pub timeout_secs: u64,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            mirror_base: None,
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Extension of files counted and linted, without the dot.
    pub source_extension: String,
    /// Default bound on each lint tool. 0 means unbounded.
    pub tool_timeout_secs: u64,
    pub linters: Vec<LintSpec>,
    pub license_weight: f64,
    pub readme_weight: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            source_extension: "py".to_string(),
            tool_timeout_secs: 60,
            linters: BuiltinLinter::ALL
                .iter()
                .map(|l| LintSpec::from_builtin(*l))
                .collect(),
            license_weight: 0.05,
            readme_weight: 0.05,
        }
    }
}

/// Which [`ReportStore`] backs the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Fs,
    Surreal,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "fs" => Ok(StoreBackend::Fs),
            "surreal" => Ok(StoreBackend::Surreal),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurrealSettings {
    pub endpoint: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub root: bool,
}

impl Default for SurrealSettings {
    fn default() -> Self {
        Self {
            endpoint: "surrealkv://.reportcard/db".to_string(),
            namespace: "reportcard".to_string(),
            database: "main".to_string(),
            username: None,
            password: None,
            root: false,
        }
    }
}

impl SurrealSettings {
    pub fn to_config(&self) -> SurrealConfig {
        let config = SurrealConfig::new(&self.endpoint)
            .with_namespace(&self.namespace)
            .with_database(&self.database);
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => config.with_credentials(SurrealCredentials {
                username: username.clone(),
                password: password.clone(),
                is_root: self.root,
            }),
            _ => config,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    /// Root directory of the filesystem store.
    pub path: PathBuf,
    pub surreal: SurrealSettings,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Fs,
            path: PathBuf::from(".reportcard"),
            surreal: SurrealSettings::default(),
        }
    }
}

/// Open the configured store.
pub async fn open_store(settings: &StoreSettings) -> Result<Arc<dyn ReportStore>, StateError> {
    info!(backend = ?settings.backend, "opening report store");
    let store: Arc<dyn ReportStore> = match settings.backend {
        StoreBackend::Memory => Arc::new(MemoryReportStore::new()),
        StoreBackend::Fs => Arc::new(FsReportStore::new(&settings.path)?),
        StoreBackend::Surreal => {
            Arc::new(SurrealReportStore::connect(&settings.surreal.to_config()).await?)
        }
    };
    Ok(store)
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub workspace: WorkspaceSettings,
    pub remote: RemoteSettings,
    pub analysis: AnalysisSettings,
    pub store: StoreSettings,
}

impl Settings {
    /// Defaults, then the file at `explicit` or `$REPORTCARD_CONFIG`, then
    /// the process environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut settings = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        settings.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|reason| ConfigError::Parse {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    /// Apply `REPORTCARD_*` overrides read through `lookup`.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
            value.trim().parse().map_err(|_| ConfigError::Env {
                key: key.to_string(),
                value,
            })
        }

        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = var("REPORTCARD_WORKSPACE_ROOT") {
            self.workspace.root = PathBuf::from(v);
        }
        if let Some(v) = var("REPORTCARD_CLONE_TIMEOUT_SECS") {
            self.workspace.clone_timeout_secs = parsed("REPORTCARD_CLONE_TIMEOUT_SECS", v)?;
        }
        if let Some(v) = var("REPORTCARD_CLONE_DEPTH") {
            self.workspace.clone_depth = parsed("REPORTCARD_CLONE_DEPTH", v)?;
        }
        if let Some(v) = var("REPORTCARD_REMOTE_SCHEME") {
            self.remote.scheme = v;
        }
        if let Some(v) = var("REPORTCARD_MIRROR_BASE") {
            self.remote.mirror_base = Some(v);
        }
        if let Some(v) = var("REPORTCARD_REMOTE_TIMEOUT_SECS") {
            self.remote.timeout_secs = parsed("REPORTCARD_REMOTE_TIMEOUT_SECS", v)?;
        }
        if let Some(v) = var("REPORTCARD_SOURCE_EXTENSION") {
            self.analysis.source_extension = v.trim_start_matches('.').to_string();
        }
        if let Some(v) = var("REPORTCARD_TOOL_TIMEOUT_SECS") {
            self.analysis.tool_timeout_secs = parsed("REPORTCARD_TOOL_TIMEOUT_SECS", v)?;
        }
        if let Some(v) = var("REPORTCARD_STORE_BACKEND") {
            self.store.backend = parsed("REPORTCARD_STORE_BACKEND", v)?;
        }
        if let Some(v) = var("REPORTCARD_STORE_PATH") {
            self.store.path = PathBuf::from(v);
        }
        if let Some(v) = var("REPORTCARD_SURREAL_ENDPOINT") {
            self.store.surreal.endpoint = v;
        }
        if let Some(v) = var("REPORTCARD_SURREAL_NAMESPACE") {
            self.store.surreal.namespace = v;
        }
        if let Some(v) = var("REPORTCARD_SURREAL_DATABASE") {
            self.store.surreal.database = v;
        }
        if let Some(v) = var("REPORTCARD_SURREAL_USERNAME") {
            self.store.surreal.username = Some(v);
        }
        if let Some(v) = var("REPORTCARD_SURREAL_PASSWORD") {
            self.store.surreal.password = Some(v);
        }
        if let Some(v) = var("REPORTCARD_SURREAL_ROOT") {
            self.store.surreal.root = parsed("REPORTCARD_SURREAL_ROOT", v.to_ascii_lowercase())?;
        }
        Ok(())
    }

    pub fn clone_timeout(&self) -> Duration {
        Duration::from_secs(self.workspace.clone_timeout_secs)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis.tool_timeout_secs)
    }

    /// `git` remote configured from the `[remote]` and `[workspace]` tables.
    pub fn git_remote(&self) -> Arc<dyn RemoteRepository> {
        let mut remote = GitRemote::new()
            .with_scheme(&self.remote.scheme)
            .with_remote_timeout(Duration::from_secs(self.remote.timeout_secs))
            .with_clone_depth(self.workspace.clone_depth);
        if let Some(base) = &self.remote.mirror_base {
            remote = remote.with_mirror_base(base);
        }
        Arc::new(remote)
    }
}
