//! Built-in engine defaults (layer 1)

use serde::{Deserialize, Serialize};

use crate::exclude::{DEFAULT_EXCLUSION_KEY, DEFAULT_EXCLUSION_PATTERN};
use crate::toolchain::VersionPolicy;

/// Where the IDE bundle installs its toolchain, SDK and packages
pub const DEFAULT_INSTALL_PREFIX: &str = "/opt/embedded-ide";

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Install prefix every root is derived from
    pub install_prefix: String,

    /// Version directory selection (default: highest)
    pub version_policy: VersionPolicy,

    /// Settings key holding the exclusion map (default: "files.exclude")
    pub exclusion_key: String,

    /// Pattern added to the exclusion map
    pub exclusion_pattern: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            install_prefix: DEFAULT_INSTALL_PREFIX.to_string(),
            version_policy: VersionPolicy::default(),
            exclusion_key: DEFAULT_EXCLUSION_KEY.to_string(),
            exclusion_pattern: DEFAULT_EXCLUSION_PATTERN.to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "install_prefix": self.install_prefix,
            "version_policy": self.version_policy,
            "roots": {},
            "exclusion": {
                "key": self.exclusion_key,
                "pattern": self.exclusion_pattern
            }
        })
    }
}
