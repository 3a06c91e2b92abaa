//! Strategy table: one override strategy per settings key.

use std::collections::BTreeMap;

use serde_json::json;

use super::strategy::{Computation, EnvRoot, PathEntry, Strategy};
use super::ResolveError;

/// Cross-compiler target triple the toolchain is installed for
pub const TARGET_TRIPLE: &str = "arm-none-eabi";

/// Exact-match mapping from key name to strategy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyTable {
    entries: BTreeMap<String, Strategy>,
}

impl StrategyTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `strategy` for `key`.
    ///
    /// A key may carry at most one strategy.
    pub fn insert(&mut self, key: impl Into<String>, strategy: Strategy) -> Result<(), ResolveError> {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return Err(ResolveError::DuplicateStrategy { key });
        }
        self.entries.insert(key, strategy);
        Ok(())
    }

    /// Strategy registered for exactly `key`
    pub fn lookup(&self, key: &str) -> Option<&Strategy> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by key
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Strategy)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Keys defaulted only when the user never set them.
fn set_if_absent_defaults() -> Vec<(&'static str, serde_json::Value)> {
    vec![
        ("workbench.list.openMode", json!("doubleClick")),
        ("editor.cursorStyle", json!("line")),
        ("files.autoSave", json!("off")),
        ("explorer.confirmDelete", json!(true)),
        ("cmake.configureOnOpen", json!(false)),
    ]
}

/// Keys pinned for the build to work.
fn forced_values() -> Vec<(&'static str, serde_json::Value)> {
    vec![("cmake.generator", json!("Ninja"))]
}

/// Keys computed from the install layout.
fn computed_values() -> Vec<(&'static str, Computation)> {
    let gcc_lib = ["lib", "gcc", TARGET_TRIPLE];
    let cxx_include = [TARGET_TRIPLE, "include", "c++"];

    vec![
        (
            "cmake.cmakePath",
            Computation::executable(EnvRoot::ToolchainBin, &["cmake"]),
        ),
        (
            "cmake.ninjaPath",
            Computation::executable(EnvRoot::ToolchainBin, &["ninja"]),
        ),
        (
            "python.defaultInterpreterPath",
            Computation::executable(EnvRoot::Packages, &["python3", "bin", "python3"]),
        ),
        ("sdk.path", Computation::root_path(EnvRoot::Sdk, &[])),
        (
            "C_Cpp.default.compilerPath",
            Computation::executable(EnvRoot::ToolchainBin, &["arm-none-eabi-gcc"]),
        ),
        (
            "C_Cpp.default.includePath",
            Computation::PathList(vec![
                PathEntry::versioned(EnvRoot::Toolchain, &gcc_lib, &["include"]),
                PathEntry::versioned(EnvRoot::Toolchain, &gcc_lib, &["include-fixed"]),
                PathEntry::versioned(EnvRoot::Toolchain, &cxx_include, &[]),
                PathEntry::versioned(EnvRoot::Toolchain, &cxx_include, &[TARGET_TRIPLE]),
                PathEntry::fixed(EnvRoot::Toolchain, &[TARGET_TRIPLE, "include"]),
                PathEntry::fixed(EnvRoot::Sdk, &["include"]),
            ]),
        ),
    ]
}

/// Assemble the built-in strategy table.
pub fn builtin_table() -> Result<StrategyTable, ResolveError> {
    let mut table = StrategyTable::new();

    for (key, value) in set_if_absent_defaults() {
        table.insert(key, Strategy::SetIfAbsent(value))?;
    }
    for (key, value) in forced_values() {
        table.insert(key, Strategy::Force(value))?;
    }
    for (key, computation) in computed_values() {
        table.insert(key, Strategy::Computed(computation))?;
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_contents() {
        let table = builtin_table().unwrap();

        assert_eq!(table.len(), 12);
        assert_eq!(
            table.lookup("cmake.generator"),
            Some(&Strategy::Force(json!("Ninja")))
        );
        assert_eq!(
            table.lookup("workbench.list.openMode"),
            Some(&Strategy::SetIfAbsent(json!("doubleClick")))
        );
        assert!(matches!(
            table.lookup("C_Cpp.default.includePath"),
            Some(Strategy::Computed(Computation::PathList(_)))
        ));
    }

    #[test]
    fn test_lookup_is_exact() {
        let table = builtin_table().unwrap();

        assert!(table.lookup("cmake").is_none());
        assert!(table.lookup("cmake.generator.extra").is_none());
        assert!(table.lookup("CMAKE.GENERATOR").is_none());
    }

    #[test]
    fn test_duplicate_strategy_rejected() {
        let mut table = StrategyTable::new();
        table.insert("a", Strategy::Force(json!(1))).unwrap();

        let result = table.insert("a", Strategy::SetIfAbsent(json!(2)));
        assert!(matches!(
            result,
            Err(ResolveError::DuplicateStrategy { ref key }) if key == "a"
        ));
        assert_eq!(table.lookup("a"), Some(&Strategy::Force(json!(1))));
    }

    #[test]
    fn test_iter_sorted_by_key() {
        let table = builtin_table().unwrap();
        let keys: Vec<&str> = table.iter().map(|(k, _)| k).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }
}
