//! Effective engine configuration with provenance
//!
//! Captures the merged configuration plus where each layer came from, and
//! turns it into typed [`EngineSettings`].

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use globset::Glob;
use override_host::StaticPaths;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;
use crate::exclude::ExclusionRule;
use crate::toolchain::VersionPolicy;

/// Schema version for effective_config
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "settings-override/effective_config@1";

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    User,
    Cli,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    /// Origin of this source
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Explicit environment roots; unset roots derive from the install prefix
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RootOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packages: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toolchain: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toolchain_bin: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdk: Option<PathBuf>,
}

/// Typed engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    pub install_prefix: PathBuf,

    #[serde(default)]
    pub roots: RootOverrides,

    #[serde(default)]
    pub version_policy: VersionPolicy,

    #[serde(default)]
    pub exclusion: ExclusionRule,
}

impl EngineSettings {
    /// Install layout after applying root overrides.
    ///
    /// An explicit toolchain root moves the default bin directory with it.
    pub fn paths(&self) -> StaticPaths {
        let mut paths = StaticPaths::under(&self.install_prefix);
        if let Some(ref packages) = self.roots.packages {
            paths.packages_root = packages.clone();
        }
        if let Some(ref toolchain) = self.roots.toolchain {
            paths.toolchain_root = toolchain.clone();
            paths.toolchain_bin_root = toolchain.join("bin");
        }
        if let Some(ref bin) = self.roots.toolchain_bin {
            paths.toolchain_bin_root = bin.clone();
        }
        if let Some(ref sdk) = self.roots.sdk {
            paths.sdk_root = sdk.clone();
        }
        paths
    }
}

/// Effective configuration with full provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    /// Schema version
    pub schema_version: u32,

    /// Schema identifier
    pub schema_id: String,

    /// When this config was computed
    pub created_at: DateTime<Utc>,

    /// The merged configuration object
    pub config: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,
}

/// Default user config location
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return Ok(PathBuf::from(xdg).join("settings-override/config.toml"));
        }
    }
    let home = std::env::var("HOME")
        .map_err(|_| ConfigError::IoError("HOME environment variable not set".to_string()))?;
    Ok(PathBuf::from(home).join(".config/settings-override/config.toml"))
}

impl EffectiveConfig {
    /// Build effective config from layers
    pub fn build(
        user_config_path: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = Vec::new();
        let mut sources = Vec::new();

        layers.push(BuiltinDefaults::default().to_value());
        sources.push(ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        });

        if let Some(path) = user_config_path {
            if path.exists() {
                let (value, digest) = Self::load_toml_file(path)?;
                layers.push(value);
                sources.push(ConfigSource {
                    origin: ConfigOrigin::User,
                    path: Some(path.to_string_lossy().to_string()),
                    digest: Some(digest),
                });
            } else {
                tracing::debug!(path = %path.display(), "no user config, using defaults");
            }
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let merged = merge_layers(layers);
        Self::validate_config(&merged)?;

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            config: merged,
            sources,
        })
    }

    /// Typed view of the merged configuration
    pub fn settings(&self) -> Result<EngineSettings, ConfigError> {
        serde_json::from_value(self.config.clone())
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    /// Load and parse a TOML file, returning the value and digest
    fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
        let bytes = fs::read(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;

        let table: toml::Table = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

        let value = serde_json::to_value(table)
            .map_err(|e| ConfigError::ParseError(format!("TOML conversion error: {}", e)))?;

        Ok((value, digest))
    }

    fn validate_config(config: &Value) -> Result<(), ConfigError> {
        match config.get("install_prefix").and_then(|v| v.as_str()) {
            Some(prefix) if !prefix.trim().is_empty() => {}
            _ => {
                return Err(ConfigError::ValidationError(
                    "install_prefix must be a non-empty path".to_string(),
                ))
            }
        }

        if let Some(policy) = config.get("version_policy") {
            serde_json::from_value::<VersionPolicy>(policy.clone()).map_err(|_| {
                ConfigError::ValidationError(format!(
                    "version_policy must be \"highest\" or \"first_listed\", got {}",
                    policy
                ))
            })?;
        }

        let exclusion = config.get("exclusion");
        let key = exclusion.and_then(|e| e.get("key")).and_then(|v| v.as_str());
        if key.map_or(true, |k| k.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "exclusion.key must be a non-empty settings key".to_string(),
            ));
        }

        let pattern = exclusion
            .and_then(|e| e.get("pattern"))
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        if pattern.is_empty() {
            return Err(ConfigError::ValidationError(
                "exclusion.pattern must not be empty".to_string(),
            ));
        }
        Glob::new(pattern).map_err(|e| {
            ConfigError::ValidationError(format!("exclusion.pattern is not a valid glob: {}", e))
        })?;

        if let Some(roots) = config.get("roots") {
            serde_json::from_value::<RootOverrides>(roots.clone())
                .map_err(|e| ConfigError::ValidationError(format!("roots: {}", e)))?;
        }

        Ok(())
    }

    /// Get a config value by path (dot-separated)
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.config;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Get a config value as string
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
