//! Settings Override - editor settings driven by the installed toolchain
//!
//! This crate rewrites the effective value of selected editor settings as
//! their keys become known: paths computed from the install layout, defaults
//! applied only where the user has not chosen, and values pinned for the
//! build to work. It also keeps one pattern present in the file-explorer
//! exclusion map without disturbing existing entries.

pub mod config;
pub mod coordinator;
pub mod exclude;
pub mod resolver;
pub mod toolchain;

use std::sync::Arc;

use override_host::FsLister;

pub use config::{ConfigError, EffectiveConfig, EngineSettings};
pub use coordinator::{KeyReport, KeyStatus, OverrideCoordinator, PassReport};
pub use exclude::{merge_exclusion, ExclusionMerge, ExclusionRule};
pub use resolver::{builtin_table, Outcome, OverrideResolver, ResolveError, Strategy, StrategyTable};
pub use toolchain::VersionPolicy;

/// Resolver over the built-in table, reading the real filesystem.
pub fn build_resolver(settings: &EngineSettings) -> Result<OverrideResolver, ResolveError> {
    Ok(OverrideResolver::new(
        builtin_table()?,
        Arc::new(settings.paths()),
        Arc::new(FsLister),
    )
    .with_policy(settings.version_policy))
}
