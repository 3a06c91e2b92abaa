//! Toolchain version directory selection
//!
//! Toolchains install headers and libraries under directories named after
//! the compiler version (e.g. `lib/gcc/arm-none-eabi/13.2.1`). Computed
//! overrides need exactly one such directory; this module picks it from a
//! directory listing according to a [`VersionPolicy`].

use std::cmp::Ordering;
use std::sync::OnceLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// How to choose among several installed version directories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionPolicy {
    /// First entry of the name-sorted listing.
    FirstListed,
    /// Highest dotted-numeric version among version-named entries.
    #[default]
    Highest,
}

/// Version directory selection errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolchainError {
    /// Listing contained no usable directory
    #[error("No version directory found among {candidates} entries")]
    NoVersionDirectory { candidates: usize },
}

/// A chosen version directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSelection {
    /// Directory name that was selected
    pub name: String,

    /// Number of candidates the policy chose from
    pub candidates: usize,
}

impl VersionSelection {
    /// Whether the choice was ambiguous
    pub fn is_ambiguous(&self) -> bool {
        self.candidates > 1
    }
}

/// Pick one version directory from `names` using `policy`.
///
/// `FirstListed` accepts any entry; `Highest` only considers names that
/// look like versions (`13`, `13.2`, `13.2.1`, ...).
pub fn select_version_dir(
    names: &[String],
    policy: VersionPolicy,
) -> Result<VersionSelection, ToolchainError> {
    let selected = match policy {
        VersionPolicy::FirstListed => names.first().map(|name| VersionSelection {
            name: name.clone(),
            candidates: names.len(),
        }),
        VersionPolicy::Highest => {
            let versions: Vec<&String> = names.iter().filter(|n| is_version_name(n)).collect();
            versions
                .iter()
                .copied()
                .max_by(|a, b| compare_versions(a, b).then_with(|| b.cmp(a)))
                .map(|name| VersionSelection {
                    name: name.clone(),
                    candidates: versions.len(),
                })
        }
    };

    selected.ok_or(ToolchainError::NoVersionDirectory {
        candidates: names.len(),
    })
}

/// Whether `name` is a dotted-numeric version
pub fn is_version_name(name: &str) -> bool {
    static VERSION: OnceLock<Regex> = OnceLock::new();
    VERSION
        .get_or_init(|| Regex::new(r"^\d+(\.\d+)*$").expect("static version pattern"))
        .is_match(name)
}

/// Compare dotted versions (e.g., "12.3" vs "13.2.1")
///
/// Numeric segments too large for `u64` compare as the maximum value.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |v: &str| -> Vec<u64> {
        v.split('.')
            .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
            .map(|s| s.parse::<u64>().unwrap_or(u64::MAX))
            .collect()
    };

    let a_parts = parse(a);
    let b_parts = parse(b);

    for (ap, bp) in a_parts.iter().zip(b_parts.iter()) {
        match ap.cmp(bp) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    a_parts.len().cmp(&b_parts.len())
}
