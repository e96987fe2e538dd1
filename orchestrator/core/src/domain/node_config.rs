// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0

// Node Configuration Types
//
// Defines the configuration manifest for a Hivemind coordinator host:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Coordination settings (execution deadline)
// - Result store backend selection
// - Event bus sizing
// - Observability settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::repository::{PostgresConfig, StorageBackend};

pub const API_VERSION: &str = "hivemind.io/v1";
pub const KIND: &str = "HiveConfig";

/// Top-level Kubernetes-style configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfigManifest {
    /// API version (must be "hivemind.io/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "HiveConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: NodeConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable node name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfigSpec {
    #[serde(default)]
    pub coordination: CoordinationConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub events: EventConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationConfig {
    /// Hard deadline for a single leader execution
    #[serde(default = "default_execution_timeout")]
    pub execution_timeout_seconds: u64,
}

impl CoordinationConfig {
    pub fn execution_timeout(&self) -> Duration {
        Duration::from_secs(self.execution_timeout_seconds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackendKind,

    /// PostgreSQL connection string (required for the postgres backend)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl StorageConfig {
    pub fn backend(&self) -> StorageBackend {
        match (self.backend, &self.database_url) {
            (StorageBackendKind::Postgres, Some(url)) => StorageBackend::PostgreSQL(PostgresConfig {
                connection_string: url.clone(),
                max_connections: self.max_connections,
            }),
            _ => StorageBackend::InMemory,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    /// How many events the bus buffers before slow subscribers start lagging
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_execution_timeout() -> u64 {
    300
}

fn default_backend() -> StorageBackendKind {
    StorageBackendKind::Memory
}

fn default_max_connections() -> u32 {
    5
}

fn default_channel_capacity() -> usize {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            execution_timeout_seconds: default_execution_timeout(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            database_url: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for NodeConfigManifest {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "hivemind-node".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: NodeConfigSpec::default(),
        }
    }
}

impl NodeConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. HIVEMIND_CONFIG_PATH environment variable
    /// 2. ./hivemind-config.yaml (working directory)
    /// 3. ~/.hivemind/config.yaml (user home)
    /// 4. /etc/hivemind/config.yaml (Unix) or C:\ProgramData\Hivemind\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("HIVEMIND_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./hivemind-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".hivemind").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/hivemind/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Hivemind\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("HIVEMIND_EXECUTION_TIMEOUT_SECONDS") {
            match val.parse::<u64>() {
                Ok(seconds) => {
                    tracing::info!("Environment override: HIVEMIND_EXECUTION_TIMEOUT_SECONDS={}", seconds);
                    self.spec.coordination.execution_timeout_seconds = seconds;
                }
                Err(_) => tracing::warn!(
                    "Invalid value for HIVEMIND_EXECUTION_TIMEOUT_SECONDS: '{}'. Expected seconds. Ignoring.",
                    val
                ),
            }
        }

        if let Some(val) = lookup("HIVEMIND_EVENT_CHANNEL_CAPACITY") {
            match val.parse::<usize>() {
                Ok(capacity) => {
                    tracing::info!("Environment override: HIVEMIND_EVENT_CHANNEL_CAPACITY={}", capacity);
                    self.spec.events.channel_capacity = capacity;
                }
                Err(_) => tracing::warn!(
                    "Invalid value for HIVEMIND_EVENT_CHANNEL_CAPACITY: '{}'. Ignoring.",
                    val
                ),
            }
        }

        if let Some(url) = lookup("HIVEMIND_DATABASE_URL") {
            if !url.is_empty() {
                tracing::info!("Environment override: HIVEMIND_DATABASE_URL set, using postgres backend");
                self.spec.storage.backend = StorageBackendKind::Postgres;
                self.spec.storage.database_url = Some(url);
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.coordination.execution_timeout_seconds == 0 {
            anyhow::bail!("spec.coordination.execution_timeout_seconds must be greater than zero");
        }

        if self.spec.events.channel_capacity == 0 {
            anyhow::bail!("spec.events.channel_capacity must be greater than zero");
        }

        if self.spec.storage.backend == StorageBackendKind::Postgres {
            match &self.spec.storage.database_url {
                Some(url) if !url.is_empty() => {}
                _ => anyhow::bail!("spec.storage.database_url is required for the postgres backend"),
            }
            if self.spec.storage.max_connections == 0 {
                anyhow::bail!("spec.storage.max_connections must be greater than zero");
            }
        }

        Ok(())
    }

    /// Log level from the manifest, if one is configured
    pub fn log_level(&self) -> Option<&str> {
        self.spec
            .observability
            .as_ref()
            .and_then(|o| o.logging.as_ref())
            .map(|l| l.level.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_manifest() {
        let manifest = NodeConfigManifest::default();
        assert_eq!(manifest.api_version, API_VERSION);
        assert_eq!(manifest.kind, KIND);
        assert!(!manifest.metadata.name.is_empty());
        assert_eq!(manifest.spec.coordination.execution_timeout_seconds, 300);
        assert_eq!(manifest.spec.events.channel_capacity, 1000);
        assert!(matches!(manifest.spec.storage.backend(), StorageBackend::InMemory));
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let yaml = r#"
apiVersion: hivemind.io/v1
kind: HiveConfig
metadata:
  name: scanner-host
spec:
  coordination:
    execution_timeout_seconds: 30
"#;
        let manifest = NodeConfigManifest::from_yaml_str(yaml).unwrap();
        assert_eq!(manifest.metadata.name, "scanner-host");
        assert_eq!(manifest.spec.coordination.execution_timeout(), Duration::from_secs(30));
        assert_eq!(manifest.spec.storage.backend, StorageBackendKind::Memory);
        assert_eq!(manifest.spec.events.channel_capacity, 1000);
        assert!(manifest.log_level().is_none());
    }

    #[test]
    fn test_postgres_backend_selection() {
        let yaml = r#"
apiVersion: hivemind.io/v1
kind: HiveConfig
metadata:
  name: prod
spec:
  storage:
    backend: postgres
    database_url: postgres://hive@localhost/hive
    max_connections: 8
  observability:
    logging:
      level: debug
"#;
        let manifest = NodeConfigManifest::from_yaml_str(yaml).unwrap();
        match manifest.spec.storage.backend() {
            StorageBackend::PostgreSQL(cfg) => {
                assert_eq!(cfg.connection_string, "postgres://hive@localhost/hive");
                assert_eq!(cfg.max_connections, 8);
            }
            other => panic!("unexpected backend: {other:?}"),
        }
        assert_eq!(manifest.log_level(), Some("debug"));
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut manifest = NodeConfigManifest::default();

        manifest.api_version = "wrong/v1".to_string();
        assert!(manifest.validate().is_err());
        manifest.api_version = API_VERSION.to_string();

        manifest.kind = "NodeConfig".to_string();
        assert!(manifest.validate().is_err());
        manifest.kind = KIND.to_string();

        manifest.metadata.name = "".to_string();
        assert!(manifest.validate().is_err());
        manifest.metadata.name = "node".to_string();

        manifest.spec.coordination.execution_timeout_seconds = 0;
        assert!(manifest.validate().is_err());
        manifest.spec.coordination.execution_timeout_seconds = 10;

        manifest.spec.events.channel_capacity = 0;
        assert!(manifest.validate().is_err());
        manifest.spec.events.channel_capacity = 16;

        manifest.spec.storage.backend = StorageBackendKind::Postgres;
        assert!(manifest.validate().is_err());
        manifest.spec.storage.database_url = Some("postgres://localhost/hive".to_string());
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let mut manifest = NodeConfigManifest::default();
        manifest.apply_overrides(|key| match key {
            "HIVEMIND_EXECUTION_TIMEOUT_SECONDS" => Some("45".to_string()),
            "HIVEMIND_EVENT_CHANNEL_CAPACITY" => Some("not-a-number".to_string()),
            "HIVEMIND_DATABASE_URL" => Some("postgres://db/hive".to_string()),
            _ => None,
        });

        assert_eq!(manifest.spec.coordination.execution_timeout_seconds, 45);
        assert_eq!(manifest.spec.events.channel_capacity, 1000);
        assert_eq!(manifest.spec.storage.backend, StorageBackendKind::Postgres);
        assert_eq!(
            manifest.spec.storage.database_url.as_deref(),
            Some("postgres://db/hive")
        );
    }

    #[test]
    fn test_yaml_file_roundtrip() {
        let mut manifest = NodeConfigManifest::default();
        manifest.metadata.name = "roundtrip".to_string();
        manifest.spec.coordination.execution_timeout_seconds = 12;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hivemind-config.yaml");
        manifest.to_yaml_file(&path).unwrap();

        let loaded = NodeConfigManifest::load_or_default(Some(path.clone())).unwrap();
        assert_eq!(loaded.metadata.name, "roundtrip");
        assert_eq!(loaded.spec.coordination.execution_timeout_seconds, 12);

        let mut broken = std::fs::File::create(&path).unwrap();
        writeln!(broken, "apiVersion: [unterminated").unwrap();
        assert!(NodeConfigManifest::load_or_default(Some(path)).is_err());
    }
}
