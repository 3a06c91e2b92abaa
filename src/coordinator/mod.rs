//! Override coordination
//!
//! Drives the resolver over every settings key: once for the keys known at
//! activation, then for each "keys added" batch the registry emits. Each key
//! is handled on its own; a failure is logged and recorded, and the pass
//! moves on to the next key.

mod report;

use std::sync::mpsc::{Receiver, TryRecvError};

use override_host::{CategoryIndex, CategoryMap, ConfigRegistry, ConfigStore, ConfigTarget, KeysAdded};

use crate::exclude::{merge_exclusion, ExclusionMerge, ExclusionRule};
use crate::resolver::{Outcome, OverrideResolver};

pub use report::{
    ExclusionStatus, KeyReport, KeyStatus, PassReport, PassTrigger, REPORT_SCHEMA_ID,
    REPORT_SCHEMA_VERSION,
};

/// Applies overrides to a settings store as keys become known.
pub struct OverrideCoordinator<S, R, C = CategoryMap> {
    store: S,
    registry: R,
    categories: C,
    resolver: OverrideResolver,
    exclusion: ExclusionRule,
    events: Option<Receiver<KeysAdded>>,
}

impl<S, R> OverrideCoordinator<S, R, CategoryMap>
where
    S: ConfigStore,
    R: ConfigRegistry,
{
    /// Create a coordinator with an empty category index
    pub fn new(store: S, registry: R, resolver: OverrideResolver) -> Self {
        Self::with_categories(store, registry, CategoryMap::new(), resolver)
    }
}

impl<S, R, C> OverrideCoordinator<S, R, C>
where
    S: ConfigStore,
    R: ConfigRegistry,
    C: CategoryIndex,
{
    pub fn with_categories(store: S, registry: R, categories: C, resolver: OverrideResolver) -> Self {
        Self {
            store,
            registry,
            categories,
            resolver,
            exclusion: ExclusionRule::default(),
            events: None,
        }
    }

    /// Set the exclusion key and pattern
    pub fn with_exclusion(mut self, exclusion: ExclusionRule) -> Self {
        self.exclusion = exclusion;
        self
    }

    /// Subscribe to new keys and process every key known right now.
    ///
    /// Calling this again re-runs the scan over the same subscription.
    pub fn activate(&mut self) -> PassReport {
        if self.events.is_none() {
            self.events = Some(self.registry.subscribe());
        }

        let keys = self.registry.current_keys();
        tracing::debug!(keys = keys.len(), "starting override scan");

        let mut report = PassReport::new(PassTrigger::Startup);
        for key in &keys {
            report.push(self.process_key(key));
        }
        log_summary(&report);
        report
    }

    /// Process every batch already delivered, without blocking.
    pub fn pump(&mut self) -> PassReport {
        let mut report = PassReport::new(PassTrigger::KeysAdded);
        let Some(events) = self.events.take() else {
            return report;
        };

        let mut connected = true;
        loop {
            match events.try_recv() {
                Ok(batch) => report.absorb(self.handle_keys_added(&batch)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    connected = false;
                    break;
                }
            }
        }
        if connected {
            self.events = Some(events);
        }
        report
    }

    /// Block on the registry's events until it stops emitting.
    pub fn run(&mut self) -> PassReport {
        let mut report = PassReport::new(PassTrigger::KeysAdded);
        let Some(events) = self.events.take() else {
            tracing::warn!("run called before activate, nothing to listen to");
            return report;
        };

        while let Ok(batch) = events.recv() {
            report.absorb(self.handle_keys_added(&batch));
        }
        tracing::debug!("keys-added subscription closed");
        report
    }

    /// Process one batch of newly registered keys in delivery order.
    pub fn handle_keys_added(&mut self, batch: &KeysAdded) -> PassReport {
        let mut report = PassReport::new(PassTrigger::KeysAdded);
        for key in &batch.keys {
            report.push(self.process_key(key));
        }
        log_summary(&report);
        report
    }

    /// Run the per-key procedure for `key`.
    pub fn process_key(&mut self, key: &str) -> KeyReport {
        if let Some(category) = self.registry.metadata(key).and_then(|m| m.category) {
            self.categories.register(&category, key);
        }

        let status = self.apply_strategy(key);
        let exclusion = if key == self.exclusion.key {
            Some(self.apply_exclusion(key))
        } else {
            None
        };

        KeyReport {
            key: key.to_string(),
            status,
            exclusion,
        }
    }

    fn apply_strategy(&mut self, key: &str) -> KeyStatus {
        let Some(strategy) = self.resolver.lookup(key) else {
            return KeyStatus::NoStrategy;
        };
        let kind = strategy.kind().to_string();

        let current = self.store.inspect(key);
        let value = match self.resolver.evaluate_strategy(strategy, &current) {
            Ok(Outcome::Replace(value)) => value,
            Ok(Outcome::Unchanged) => return KeyStatus::Unchanged { strategy: kind },
            Err(e) => {
                tracing::error!(key = %key, strategy = %kind, error = %e, "failed to resolve override");
                return KeyStatus::Failed {
                    reason: e.to_string(),
                };
            }
        };

        match self.store.update(key, value, ConfigTarget::User) {
            Ok(()) => {
                tracing::debug!(key = %key, strategy = %kind, "override applied");
                KeyStatus::Applied { strategy: kind }
            }
            Err(e) => {
                tracing::error!(key = %key, error = %e, "failed to write override");
                KeyStatus::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn apply_exclusion(&mut self, key: &str) -> ExclusionStatus {
        let current = self.store.inspect(key);
        match merge_exclusion(&current, &self.exclusion.pattern) {
            ExclusionMerge::Changed(map) => {
                match self.store.update(key, map.into(), ConfigTarget::User) {
                    Ok(()) => {
                        tracing::debug!(key = %key, pattern = %self.exclusion.pattern, "exclusion added");
                        ExclusionStatus::Written
                    }
                    Err(e) => {
                        tracing::error!(key = %key, error = %e, "failed to write exclusion map");
                        ExclusionStatus::Failed {
                            reason: e.to_string(),
                        }
                    }
                }
            }
            ExclusionMerge::Unchanged => ExclusionStatus::AlreadyPresent,
            ExclusionMerge::Malformed => {
                tracing::warn!(key = %key, "exclusion setting is not a map, leaving it alone");
                ExclusionStatus::Malformed
            }
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Registry access, e.g. to declare keys after activation
    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    pub fn categories(&self) -> &C {
        &self.categories
    }

    pub fn resolver(&self) -> &OverrideResolver {
        &self.resolver
    }

    pub fn exclusion(&self) -> &ExclusionRule {
        &self.exclusion
    }

    /// Whether a keys-added subscription is live
    pub fn is_subscribed(&self) -> bool {
        self.events.is_some()
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

fn log_summary(report: &PassReport) {
    if report.keys.is_empty() {
        return;
    }
    tracing::info!(trigger = ?report.trigger, "{}", report.human_summary());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::builtin_table;
    use override_host::{HostError, KeyMetadata, MemoryRegistry, MemoryStore, StaticPaths};
    use override_host::{DirectoryLister, FsLister};
    use serde_json::json;
    use std::path::Path;
    use std::sync::Arc;
    use tracing_test::traced_test;

    struct EmptyLister;

    impl DirectoryLister for EmptyLister {
        fn list_dirs(&self, path: &Path) -> Result<Vec<String>, HostError> {
            Err(HostError::NotFound(path.to_path_buf()))
        }
    }

    fn coordinator(keys: &[&str]) -> OverrideCoordinator<MemoryStore, MemoryRegistry> {
        let mut registry = MemoryRegistry::new();
        registry.register(
            keys.iter()
                .map(|k| (k.to_string(), KeyMetadata::default()))
                .collect(),
        );
        let resolver = OverrideResolver::new(
            builtin_table().unwrap(),
            Arc::new(StaticPaths::under(Path::new("/opt/ide"))),
            Arc::new(EmptyLister),
        );
        OverrideCoordinator::new(MemoryStore::new(), registry, resolver)
    }

    #[test]
    fn test_activate_subscribes_once() {
        let mut coord = coordinator(&["cmake.generator"]);
        assert!(!coord.is_subscribed());

        coord.activate();
        coord.activate();
        assert!(coord.is_subscribed());

        coord
            .registry_mut()
            .register(vec![("editor.cursorStyle".to_string(), KeyMetadata::default())]);
        let report = coord.pump();
        assert_eq!(report.keys.len(), 1);
    }

    #[test]
    fn test_pump_without_activate_is_empty() {
        let mut coord = coordinator(&[]);
        let report = coord.pump();
        assert!(report.keys.is_empty());
        assert_eq!(report.trigger, PassTrigger::KeysAdded);
    }

    #[test]
    fn test_run_returns_when_registry_closes() {
        let mut coord = coordinator(&[]);
        coord.activate();
        coord.registry_mut().register(vec![(
            "cmake.generator".to_string(),
            KeyMetadata::default(),
        )]);
        coord.registry_mut().close();

        let report = coord.run();
        assert_eq!(report.keys.len(), 1);
        assert!(!coord.is_subscribed());
        assert_eq!(coord.store().user_value("cmake.generator"), Some(&json!("Ninja")));
    }

    #[test]
    fn test_pump_drops_closed_subscription() {
        let mut coord = coordinator(&[]);
        coord.activate();
        coord.registry_mut().close();

        coord.pump();
        assert!(!coord.is_subscribed());
    }

    #[test]
    #[traced_test]
    fn test_failure_is_logged_with_key() {
        let mut coord = coordinator(&["C_Cpp.default.includePath"]);
        let report = coord.activate();

        assert_eq!(report.failures().count(), 1);
        assert!(logs_contain("failed to resolve override"));
        assert!(logs_contain("C_Cpp.default.includePath"));
    }

    #[test]
    #[traced_test]
    fn test_empty_version_directory_fails_once_and_batch_continues() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("toolchain/lib/gcc/arm-none-eabi")).unwrap();
        let resolver = OverrideResolver::new(
            builtin_table().unwrap(),
            Arc::new(StaticPaths::under(dir.path())),
            Arc::new(FsLister),
        );
        let mut coord = OverrideCoordinator::new(MemoryStore::new(), MemoryRegistry::new(), resolver);
        coord.activate();

        coord.registry_mut().register(vec![
            ("C_Cpp.default.includePath".to_string(), KeyMetadata::default()),
            ("cmake.generator".to_string(), KeyMetadata::default()),
        ]);
        let report = coord.pump();

        assert!(matches!(
            report.get("C_Cpp.default.includePath").unwrap().status,
            KeyStatus::Failed { .. }
        ));
        assert!(coord.store().user_value("C_Cpp.default.includePath").is_none());
        assert_eq!(coord.store().user_value("cmake.generator"), Some(&json!("Ninja")));
        assert_eq!(coord.store().write_count(), 1);

        logs_assert(|lines: &[&str]| {
            match lines
                .iter()
                .filter(|line| line.contains("failed to resolve override"))
                .count()
            {
                1 => Ok(()),
                n => Err(format!("expected one failure line, got {}", n)),
            }
        });
    }

    #[test]
    fn test_custom_exclusion_rule() {
        let mut coord = coordinator(&["search.exclude"]).with_exclusion(ExclusionRule {
            key: "search.exclude".to_string(),
            pattern: "**/build".to_string(),
        });
        let report = coord.activate();

        assert!(report.exclusion_written());
        assert_eq!(
            coord.store().user_value("search.exclude"),
            Some(&json!({"**/build": true}))
        );
    }
}
