//! Override strategy definitions.

use std::path::PathBuf;

use override_host::EnvironmentPaths;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How one settings key is overridden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Strategy {
    /// Derived from the install layout; the current value is ignored.
    Computed(Computation),
    /// Applied only when the user never configured the key.
    SetIfAbsent(Value),
    /// Applied unconditionally.
    Force(Value),
}

impl Strategy {
    /// Short name of the strategy kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Computed(_) => "computed",
            Self::SetIfAbsent(_) => "set_if_absent",
            Self::Force(_) => "force",
        }
    }
}

/// Environment root a computed path starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvRoot {
    Packages,
    ToolchainBin,
    Toolchain,
    Sdk,
}

impl EnvRoot {
    /// Resolve against the host layout.
    pub fn path(self, env: &dyn EnvironmentPaths) -> PathBuf {
        match self {
            Self::Packages => env.packages_root(),
            Self::ToolchainBin => env.toolchain_bin_root(),
            Self::Toolchain => env.toolchain_root(),
            Self::Sdk => env.sdk_root(),
        }
    }
}

/// Environment-derived value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Computation {
    /// One path under a root, yielding a JSON string.
    RootPath {
        root: EnvRoot,
        segments: Vec<String>,
        /// Append the platform executable suffix to the last segment.
        #[serde(default)]
        executable: bool,
    },
    /// Several paths, yielding a de-duplicated JSON array of strings.
    PathList(Vec<PathEntry>),
}

/// One element of a computed path list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathEntry {
    /// `root/segments...`
    Fixed { root: EnvRoot, segments: Vec<String> },
    /// `root/scan.../<version>/suffix...`
    Versioned(VersionedPath),
}

/// A path beneath the single version directory found in `root/scan`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedPath {
    pub root: EnvRoot,
    /// Directory whose children are version directories
    pub scan: Vec<String>,
    /// Relative path joined beneath the chosen version directory
    pub suffix: Vec<String>,
}

pub(crate) fn segments(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

impl Computation {
    /// `root/parts...`
    pub fn root_path(root: EnvRoot, parts: &[&str]) -> Self {
        Self::RootPath {
            root,
            segments: segments(parts),
            executable: false,
        }
    }

    /// `root/parts...` with the executable suffix on the last part.
    pub fn executable(root: EnvRoot, parts: &[&str]) -> Self {
        Self::RootPath {
            root,
            segments: segments(parts),
            executable: true,
        }
    }
}

impl PathEntry {
    pub fn fixed(root: EnvRoot, parts: &[&str]) -> Self {
        Self::Fixed {
            root,
            segments: segments(parts),
        }
    }

    pub fn versioned(root: EnvRoot, scan: &[&str], suffix: &[&str]) -> Self {
        Self::Versioned(VersionedPath {
            root,
            scan: segments(scan),
            suffix: segments(suffix),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use override_host::StaticPaths;
    use serde_json::json;
    use std::path::Path;

    #[test]
    fn test_env_root_path() {
        let env = StaticPaths::under(Path::new("/opt/ide"));
        assert_eq!(EnvRoot::Packages.path(&env), PathBuf::from("/opt/ide/packages"));
        assert_eq!(EnvRoot::Toolchain.path(&env), PathBuf::from("/opt/ide/toolchain"));
    }

    #[test]
    fn test_strategy_kind() {
        assert_eq!(Strategy::Force(json!("Ninja")).kind(), "force");
        assert_eq!(Strategy::SetIfAbsent(json!(false)).kind(), "set_if_absent");
        assert_eq!(
            Strategy::Computed(Computation::root_path(EnvRoot::Sdk, &[])).kind(),
            "computed"
        );
    }

    #[test]
    fn test_strategy_serialization_is_tagged() {
        let value = serde_json::to_value(Strategy::Force(json!("Ninja"))).unwrap();
        assert_eq!(value, json!({"kind": "force", "value": "Ninja"}));
    }
}
