//! File-explorer exclusion patch
//!
//! Ensures a fixed pattern is marked ignored in the exclusion map without
//! touching any entry the user or the defaults already carry.

use override_host::Inspection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Settings key holding the exclusion map
pub const DEFAULT_EXCLUSION_KEY: &str = "files.exclude";

/// Pattern added to the exclusion map
pub const DEFAULT_EXCLUSION_PATTERN: &str = "**/.ide-cache";

/// Which key holds the exclusion map and which pattern it must contain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionRule {
    pub key: String,
    pub pattern: String,
}

impl Default for ExclusionRule {
    fn default() -> Self {
        Self {
            key: DEFAULT_EXCLUSION_KEY.to_string(),
            pattern: DEFAULT_EXCLUSION_PATTERN.to_string(),
        }
    }
}

/// Result of merging a pattern into an exclusion map
#[derive(Debug, Clone, PartialEq)]
pub enum ExclusionMerge {
    /// Pattern was added; write this map to the user layer
    Changed(Map<String, Value>),
    /// Pattern already present; no write
    Unchanged,
    /// Base value is not a map; left alone
    Malformed,
}

/// Merge `pattern` into the effective exclusion map of `current`.
///
/// The base is the user value when set, the default otherwise, and an empty
/// map when neither exists. Existing entries are kept as they are, including
/// ones mapped to `false`.
pub fn merge_exclusion(current: &Inspection, pattern: &str) -> ExclusionMerge {
    let mut merged = match current.effective() {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(base)) => base.clone(),
        Some(_) => return ExclusionMerge::Malformed,
    };

    if merged.contains_key(pattern) {
        return ExclusionMerge::Unchanged;
    }
    merged.insert(pattern.to_string(), Value::Bool(true));
    ExclusionMerge::Changed(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(value: Value) -> Inspection {
        Inspection {
            user_value: Some(value),
            default_value: None,
        }
    }

    #[test]
    fn test_adds_missing_pattern() {
        let result = merge_exclusion(&user(json!({"a.txt": true})), "b.cfg");

        let expected = json!({"a.txt": true, "b.cfg": true});
        assert_eq!(
            result,
            ExclusionMerge::Changed(expected.as_object().unwrap().clone())
        );
    }

    #[test]
    fn test_present_pattern_is_unchanged() {
        let result = merge_exclusion(&user(json!({"a.txt": true})), "a.txt");
        assert_eq!(result, ExclusionMerge::Unchanged);
    }

    #[test]
    fn test_false_entry_is_not_overwritten() {
        let result = merge_exclusion(&user(json!({"a.txt": false})), "a.txt");
        assert_eq!(result, ExclusionMerge::Unchanged);
    }

    #[test]
    fn test_user_value_wins_over_default() {
        let current = Inspection {
            user_value: Some(json!({"user.log": true})),
            default_value: Some(json!({"**/.git": true})),
        };

        match merge_exclusion(&current, "b.cfg") {
            ExclusionMerge::Changed(map) => {
                assert!(map.contains_key("user.log"));
                assert!(!map.contains_key("**/.git"));
                assert_eq!(map.get("b.cfg"), Some(&json!(true)));
            }
            other => panic!("Expected Changed, got {:?}", other),
        }
    }

    #[test]
    fn test_default_used_when_user_unset() {
        let current = Inspection {
            user_value: None,
            default_value: Some(json!({"**/.git": true, "**/.svn": true})),
        };

        match merge_exclusion(&current, "b.cfg") {
            ExclusionMerge::Changed(map) => {
                assert_eq!(map.len(), 3);
                assert_eq!(map.get("**/.git"), Some(&json!(true)));
            }
            other => panic!("Expected Changed, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_map_starts_empty() {
        let result = merge_exclusion(&Inspection::default(), "b.cfg");
        let expected = json!({"b.cfg": true});
        assert_eq!(
            result,
            ExclusionMerge::Changed(expected.as_object().unwrap().clone())
        );
    }

    #[test]
    fn test_non_map_is_malformed() {
        assert_eq!(
            merge_exclusion(&user(json!(["a.txt"])), "b.cfg"),
            ExclusionMerge::Malformed
        );
    }
}
