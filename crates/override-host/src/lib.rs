//! Override Host Contracts
//!
//! Defines the services a settings-override pass consumes from its host:
//! the layered settings store, the key registry and its "keys added"
//! events, the category index, and the environment layout.

pub mod category;
pub mod env;
pub mod error;
pub mod registry;
pub mod store;

pub use category::{CategoryIndex, CategoryMap};
pub use env::{resolve_path, DirectoryLister, EnvironmentPaths, FsLister, StaticPaths};
pub use error::HostError;
pub use registry::{ConfigRegistry, KeyMetadata, KeysAdded, MemoryRegistry};
pub use store::{ConfigStore, ConfigTarget, Inspection, MemoryStore};
