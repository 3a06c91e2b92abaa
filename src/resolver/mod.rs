//! Override resolution
//!
//! Maps a settings key to its override strategy and evaluates it against
//! the key's current values. Evaluation only reads: the supplied
//! [`Inspection`] plus the injected environment services. Writes belong to
//! the coordinator.

mod strategy;
mod table;

use std::collections::HashSet;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use override_host::{resolve_path, DirectoryLister, EnvironmentPaths, HostError, Inspection};
use serde_json::Value;

use crate::toolchain::{select_version_dir, ToolchainError, VersionPolicy};

pub use strategy::{Computation, EnvRoot, PathEntry, Strategy, VersionedPath};
pub use table::{builtin_table, StrategyTable, TARGET_TRIPLE};

/// Result of evaluating a strategy
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Write this value into the user layer
    Replace(Value),
    /// Leave the key untouched
    Unchanged,
}

/// Resolution errors
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("A strategy is already registered for '{key}'")]
    DuplicateStrategy { key: String },

    #[error("Directory does not exist: {}", .path.display())]
    MissingDirectory { path: PathBuf },

    #[error("No version directory in {}: {source}", .path.display())]
    NoVersionDirectory {
        path: PathBuf,
        #[source]
        source: ToolchainError,
    },

    #[error("Cannot list {}: {source}", .path.display())]
    Listing {
        path: PathBuf,
        #[source]
        source: HostError,
    },
}

/// Strategy table plus the services computed strategies read from.
pub struct OverrideResolver {
    table: StrategyTable,
    env: Arc<dyn EnvironmentPaths>,
    lister: Arc<dyn DirectoryLister>,
    policy: VersionPolicy,
}

impl OverrideResolver {
    pub fn new(
        table: StrategyTable,
        env: Arc<dyn EnvironmentPaths>,
        lister: Arc<dyn DirectoryLister>,
    ) -> Self {
        Self {
            table,
            env,
            lister,
            policy: VersionPolicy::default(),
        }
    }

    /// Set how version directories are chosen
    pub fn with_policy(mut self, policy: VersionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn table(&self) -> &StrategyTable {
        &self.table
    }

    pub fn policy(&self) -> VersionPolicy {
        self.policy
    }

    /// Strategy registered for `key`, if any
    pub fn lookup(&self, key: &str) -> Option<&Strategy> {
        self.table.lookup(key)
    }

    /// Evaluate the strategy for `key` against its current values.
    ///
    /// Keys without a strategy evaluate to [`Outcome::Unchanged`].
    pub fn evaluate(&self, key: &str, current: &Inspection) -> Result<Outcome, ResolveError> {
        match self.table.lookup(key) {
            Some(strategy) => self.evaluate_strategy(strategy, current),
            None => Ok(Outcome::Unchanged),
        }
    }

    /// Evaluate one strategy.
    pub fn evaluate_strategy(
        &self,
        strategy: &Strategy,
        current: &Inspection,
    ) -> Result<Outcome, ResolveError> {
        match strategy {
            Strategy::Computed(computation) => self.compute(computation).map(Outcome::Replace),
            Strategy::SetIfAbsent(value) => Ok(match current.user_value {
                None => Outcome::Replace(value.clone()),
                Some(_) => Outcome::Unchanged,
            }),
            Strategy::Force(value) => Ok(Outcome::Replace(value.clone())),
        }
    }

    fn compute(&self, computation: &Computation) -> Result<Value, ResolveError> {
        match computation {
            Computation::RootPath {
                root,
                segments,
                executable,
            } => {
                let mut path = resolve_path(&root.path(self.env.as_ref()), segments);
                if *executable {
                    path = with_exe_suffix(path);
                }
                Ok(path_value(&path))
            }
            Computation::PathList(entries) => {
                let mut paths = Vec::with_capacity(entries.len());
                for entry in entries {
                    paths.push(self.entry_path(entry)?);
                }
                Ok(Value::Array(
                    dedup_stable(paths).iter().map(|p| path_value(p)).collect(),
                ))
            }
        }
    }

    fn entry_path(&self, entry: &PathEntry) -> Result<PathBuf, ResolveError> {
        match entry {
            PathEntry::Fixed { root, segments } => {
                Ok(resolve_path(&root.path(self.env.as_ref()), segments))
            }
            PathEntry::Versioned(versioned) => self.versioned_path(versioned),
        }
    }

    fn versioned_path(&self, versioned: &VersionedPath) -> Result<PathBuf, ResolveError> {
        let dir = resolve_path(&versioned.root.path(self.env.as_ref()), &versioned.scan);
        let names = self.lister.list_dirs(&dir).map_err(|e| match e {
            HostError::NotFound(path) => ResolveError::MissingDirectory { path },
            source => ResolveError::Listing {
                path: dir.clone(),
                source,
            },
        })?;

        let selection = select_version_dir(&names, self.policy).map_err(|source| {
            ResolveError::NoVersionDirectory {
                path: dir.clone(),
                source,
            }
        })?;
        if selection.is_ambiguous() {
            tracing::warn!(
                dir = %dir.display(),
                chosen = %selection.name,
                candidates = selection.candidates,
                policy = ?self.policy,
                "multiple version directories installed"
            );
        }

        Ok(resolve_path(&dir.join(&selection.name), &versioned.suffix))
    }
}

/// Remove duplicates, keeping the first occurrence of each element.
pub fn dedup_stable<T: Eq + Hash + Clone>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

fn with_exe_suffix(path: PathBuf) -> PathBuf {
    let suffix = std::env::consts::EXE_SUFFIX;
    if suffix.is_empty() {
        return path;
    }
    let mut raw = path.into_os_string();
    raw.push(suffix);
    PathBuf::from(raw)
}

fn path_value(path: &Path) -> Value {
    Value::String(path.to_string_lossy().into_owned())
}
