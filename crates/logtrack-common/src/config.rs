//! ---
//! lt_section: "01-core-functionality"
//! lt_subsection: "module"
//! lt_type: "source"
//! lt_scope: "code"
//! lt_description: "Host configuration model, loader and environment overrides."
//! lt_version: "v0.0.0-prealpha"
//! lt_owner: "tbd"
//! ---
use std::collections::{HashMap, HashSet};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::debug;

use crate::logging::LogFormat;
use crate::route::check_remote_route;
pub use crate::route::RESERVED_SEGMENTS;

fn default_bind() -> SocketAddr {
    "0.0.0.0:8080".parse().expect("valid default bind address")
}

fn default_probe_timeout() -> Duration {
    Duration::from_millis(3000)
}

fn default_load_timeout() -> Duration {
    Duration::from_millis(10_000)
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_remotes() -> IndexMap<String, RemoteConfig> {
    let mut remotes = IndexMap::new();
    remotes.insert(
        "users".to_owned(),
        RemoteConfig {
            label: "Users".to_owned(),
            route: "/users".to_owned(),
            manifest_url: "http://localhost:5001/assets/remoteEntry.js".to_owned(),
            entry_url: "http://localhost:5001/widget".to_owned(),
            description: Some("manages user information".to_owned()),
        },
    );
    remotes.insert(
        "audit".to_owned(),
        RemoteConfig {
            label: "Audit".to_owned(),
            route: "/audit".to_owned(),
            manifest_url: "http://localhost:5002/assets/remoteEntry.js".to_owned(),
            entry_url: "http://localhost:5002/widget".to_owned(),
            description: Some("analytics & audit trail".to_owned()),
        },
    );
    remotes
}

/// Primary configuration object for the host shell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "default_remotes")]
    pub remotes: IndexMap<String, RemoteConfig>,
}

/// Metadata describing where a [`HostConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedHostConfig {
    pub config: HostConfig,
    /// `None` when no file was found and built-in defaults are in effect.
    pub source: Option<PathBuf>,
    /// `LOGTRACK_CONFIG` value that an explicit path took precedence over.
    pub overridden_env_path: Option<PathBuf>,
}

impl HostConfig {
    pub const ENV_CONFIG_PATH: &'static str = "LOGTRACK_CONFIG";
    pub const ENV_BIND: &'static str = "LOGTRACK_BIND";
    pub const ENV_PROBE_TIMEOUT_MS: &'static str = "LOGTRACK_PROBE_TIMEOUT_MS";

    /// Load configuration from disk, respecting the `LOGTRACK_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration together with the effective source path.
    ///
    /// Unlike an explicit `LOGTRACK_CONFIG` path, missing candidates are not an
    /// error: the built-in local development defaults apply instead. Process
    /// environment overrides are applied and the result is validated.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedHostConfig> {
        Self::load_from(None, candidates)
    }

    /// Like [`HostConfig::load_with_source`], with an operator supplied path
    /// (the `--config` flag) that takes precedence over `LOGTRACK_CONFIG`.
    /// A missing explicit path is an error.
    pub fn load_from<P: AsRef<Path>>(
        explicit: Option<&Path>,
        candidates: &[P],
    ) -> Result<LoadedHostConfig> {
        let env_path = std::env::var(Self::ENV_CONFIG_PATH).ok();
        let mut loaded = Self::resolve(explicit, env_path.as_deref(), candidates)?;
        loaded
            .config
            .apply_overrides(|key| std::env::var(key).ok())?;
        loaded.config.validate()?;
        Ok(loaded)
    }

    fn resolve<P: AsRef<Path>>(
        explicit: Option<&Path>,
        env_path: Option<&str>,
        candidates: &[P],
    ) -> Result<LoadedHostConfig> {
        let env_path = env_path.map(str::trim).filter(|p| !p.is_empty());
        if let Some(path) = explicit {
            let config = Self::from_path(path)?;
            return Ok(LoadedHostConfig {
                config,
                source: Some(path.to_path_buf()),
                overridden_env_path: env_path.map(PathBuf::from),
            });
        }
        if let Some(env_path) = env_path {
            let path = PathBuf::from(env_path);
            let config = Self::from_path(&path)?;
            return Ok(LoadedHostConfig {
                config,
                source: Some(path),
                overridden_env_path: None,
            });
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_path(path)?;
                return Ok(LoadedHostConfig {
                    config,
                    source: Some(path.to_path_buf()),
                    overridden_env_path: None,
                });
            }
        }

        debug!("no host configuration file found; using built-in defaults");
        Ok(LoadedHostConfig {
            config: HostConfig::default(),
            source: None,
            overridden_env_path: None,
        })
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        toml::from_str::<HostConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Apply environment overrides resolved through `lookup`.
    ///
    /// Recognised keys are `LOGTRACK_BIND`, `LOGTRACK_PROBE_TIMEOUT_MS` and,
    /// per remote, [`RemoteConfig::manifest_env_key`] and
    /// [`RemoteConfig::entry_env_key`].
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = non_empty(lookup(Self::ENV_BIND)) {
            self.server.bind = bind
                .parse()
                .with_context(|| format!("invalid {} value {bind:?}", Self::ENV_BIND))?;
        }
        if let Some(timeout) = non_empty(lookup(Self::ENV_PROBE_TIMEOUT_MS)) {
            let millis: u64 = timeout.parse().with_context(|| {
                format!("invalid {} value {timeout:?}", Self::ENV_PROBE_TIMEOUT_MS)
            })?;
            self.probe.timeout = Duration::from_millis(millis);
        }
        for (id, remote) in self.remotes.iter_mut() {
            if let Some(url) = non_empty(lookup(&RemoteConfig::manifest_env_key(id))) {
                remote.manifest_url = url;
            }
            if let Some(url) = non_empty(lookup(&RemoteConfig::entry_env_key(id))) {
                remote.entry_url = url;
            }
        }
        Ok(())
    }

    /// Validate structural invariants.
    ///
    /// URLs are not checked here. A malformed manifest URL surfaces as an
    /// offline remote.
    pub fn validate(&self) -> Result<()> {
        if self.remotes.is_empty() {
            return Err(anyhow!("configuration must declare at least one remote"));
        }
        if self.probe.timeout.is_zero() {
            return Err(anyhow!("probe timeout must be greater than zero"));
        }
        if self.loader.timeout.is_zero() {
            return Err(anyhow!("loader timeout must be greater than zero"));
        }
        let mut routes = HashSet::new();
        let mut env_keys: HashMap<String, &str> = HashMap::new();
        for (id, remote) in &self.remotes {
            validate_remote_id(id)?;
            remote.validate(id)?;
            // `audit-trail` and `audit_trail` would share one override pair.
            if let Some(other) = env_keys.insert(env_fragment(id), id) {
                return Err(anyhow!(
                    "remote ids '{}' and '{}' both map to {}",
                    other,
                    id,
                    RemoteConfig::manifest_env_key(id)
                ));
            }
            if !routes.insert(remote.route.as_str()) {
                return Err(anyhow!(
                    "remote '{}' reuses route {} already claimed by another remote",
                    id,
                    remote.route
                ));
            }
        }
        Ok(())
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            probe: ProbeConfig::default(),
            loader: LoaderConfig::default(),
            logging: LoggingConfig::default(),
            remotes: default_remotes(),
        }
    }
}

impl std::str::FromStr for HostConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: HostConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn validate_remote_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(anyhow!(
            "remote id '{}' must be non-empty lowercase ascii, digits, '-' or '_'",
            id
        ))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(rename = "timeout_ms", default = "default_probe_timeout")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: default_probe_timeout(),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    #[serde(rename = "timeout_ms", default = "default_load_timeout")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub timeout: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            timeout: default_load_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

/// One remote micro-frontend as declared in configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteConfig {
    pub label: String,
    pub route: String,
    /// Probe target.
    pub manifest_url: String,
    /// Load target for the remote's UI fragment.
    pub entry_url: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl RemoteConfig {
    pub fn manifest_env_key(id: &str) -> String {
        format!("LOGTRACK_REMOTE_{}_MANIFEST_URL", env_fragment(id))
    }

    pub fn entry_env_key(id: &str) -> String {
        format!("LOGTRACK_REMOTE_{}_ENTRY_URL", env_fragment(id))
    }

    fn validate(&self, id: &str) -> Result<()> {
        if self.label.trim().is_empty() {
            return Err(anyhow!("remote '{}' must have a label", id));
        }
        check_remote_route(&self.route)
            .with_context(|| format!("remote '{}' has invalid route {:?}", id, self.route))
    }
}

fn env_fragment(id: &str) -> String {
    id.to_ascii_uppercase().replace('-', "_")
}
