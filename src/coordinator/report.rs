//! Pass report (override_report.json)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema version for override_report.json
pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for override_report.json
pub const REPORT_SCHEMA_ID: &str = "settings-override/report@1";

/// What started a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassTrigger {
    /// Enumeration of every key known at activation
    Startup,
    /// One or more "keys added" batches
    KeysAdded,
}

/// Strategy result for one key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum KeyStatus {
    /// A value was written to the user layer
    Applied { strategy: String },
    /// The strategy declined to change the key
    Unchanged { strategy: String },
    /// No strategy is registered for the key
    NoStrategy,
    /// Evaluation or the write failed; the key was left as it was
    Failed { reason: String },
}

impl KeyStatus {
    /// Short status name
    pub fn label(&self) -> &'static str {
        match self {
            Self::Applied { .. } => "applied",
            Self::Unchanged { .. } => "unchanged",
            Self::NoStrategy => "no_strategy",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Exclusion patch result for the exclusion key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExclusionStatus {
    Written,
    AlreadyPresent,
    Malformed,
    Failed { reason: String },
}

/// Everything that happened to one key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyReport {
    pub key: String,

    #[serde(flatten)]
    pub status: KeyStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusion: Option<ExclusionStatus>,
}

/// Report for one pass (startup scan or event batches)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassReport {
    /// Schema version
    pub schema_version: u32,

    /// Schema identifier
    pub schema_id: String,

    /// When the pass started
    pub created_at: DateTime<Utc>,

    /// What started the pass
    pub trigger: PassTrigger,

    /// Per-key results in processing order
    pub keys: Vec<KeyReport>,
}

impl PassReport {
    pub fn new(trigger: PassTrigger) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            schema_id: REPORT_SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            trigger,
            keys: Vec::new(),
        }
    }

    pub fn push(&mut self, report: KeyReport) {
        self.keys.push(report);
    }

    /// Append the keys of a later report
    pub fn absorb(&mut self, other: PassReport) {
        self.keys.extend(other.keys);
    }

    /// Report for `key`, the last one when processed more than once
    pub fn get(&self, key: &str) -> Option<&KeyReport> {
        self.keys.iter().rev().find(|r| r.key == key)
    }

    /// Keys whose value was written
    pub fn applied(&self) -> impl Iterator<Item = &KeyReport> {
        self.keys
            .iter()
            .filter(|r| matches!(r.status, KeyStatus::Applied { .. }))
    }

    /// Keys that failed, strategy or exclusion
    pub fn failures(&self) -> impl Iterator<Item = &KeyReport> {
        self.keys.iter().filter(|r| {
            matches!(r.status, KeyStatus::Failed { .. })
                || matches!(r.exclusion, Some(ExclusionStatus::Failed { .. }))
        })
    }

    /// Number of keys that had a registered strategy
    pub fn overridden_count(&self) -> usize {
        self.keys
            .iter()
            .filter(|r| !matches!(r.status, KeyStatus::NoStrategy))
            .count()
    }

    /// Whether the exclusion map was written during this pass
    pub fn exclusion_written(&self) -> bool {
        self.keys
            .iter()
            .any(|r| r.exclusion == Some(ExclusionStatus::Written))
    }

    /// One-line human summary
    pub fn human_summary(&self) -> String {
        let applied = self.applied().count();
        let failed = self.failures().count();
        let mut summary = format!(
            "{} key(s) scanned, {} with overrides, {} applied, {} failed",
            self.keys.len(),
            self.overridden_count(),
            applied,
            failed
        );
        if self.exclusion_written() {
            summary.push_str(", exclusion map updated");
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(key: &str, status: KeyStatus) -> KeyReport {
        KeyReport {
            key: key.to_string(),
            status,
            exclusion: None,
        }
    }

    #[test]
    fn test_counts_and_summary() {
        let mut report = PassReport::new(PassTrigger::Startup);
        report.push(key(
            "cmake.generator",
            KeyStatus::Applied {
                strategy: "force".to_string(),
            },
        ));
        report.push(key("editor.fontSize", KeyStatus::NoStrategy));
        report.push(key(
            "C_Cpp.default.includePath",
            KeyStatus::Failed {
                reason: "no version".to_string(),
            },
        ));
        report.push(KeyReport {
            key: "files.exclude".to_string(),
            status: KeyStatus::NoStrategy,
            exclusion: Some(ExclusionStatus::Written),
        });

        assert_eq!(report.applied().count(), 1);
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.overridden_count(), 2);
        assert!(report.exclusion_written());
        assert_eq!(
            report.human_summary(),
            "4 key(s) scanned, 2 with overrides, 1 applied, 1 failed, exclusion map updated"
        );
    }

    #[test]
    fn test_get_returns_latest() {
        let mut report = PassReport::new(PassTrigger::KeysAdded);
        report.push(key("a", KeyStatus::NoStrategy));
        report.push(key(
            "a",
            KeyStatus::Unchanged {
                strategy: "set_if_absent".to_string(),
            },
        ));

        assert!(matches!(
            report.get("a").unwrap().status,
            KeyStatus::Unchanged { .. }
        ));
        assert!(report.get("b").is_none());
    }

    #[test]
    fn test_key_report_serialization() {
        let report = key(
            "cmake.generator",
            KeyStatus::Applied {
                strategy: "force".to_string(),
            },
        );
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["key"], "cmake.generator");
        assert_eq!(json["status"], "applied");
        assert_eq!(json["strategy"], "force");
        assert!(json.get("exclusion").is_none());
    }
}
