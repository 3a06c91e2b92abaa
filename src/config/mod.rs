//! Engine configuration
//!
//! Layered the same way every time:
//! 1. Built-in defaults
//! 2. User config (~/.config/settings-override/config.toml)
//! 3. CLI flags
//!
//! The merged result is deserialized into [`EngineSettings`].

mod defaults;
mod effective;
mod merge;

pub use defaults::{BuiltinDefaults, DEFAULT_INSTALL_PREFIX};
pub use effective::{
    default_config_path, ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig, EngineSettings,
    RootOverrides,
};
pub use merge::{deep_merge, merge_layers};
