//! File-backed pass: engine config, key schema and settings on disk.

use std::fs;

use override_host::{MemoryRegistry, MemoryStore};
use serde_json::json;
use settings_override::{build_resolver, EffectiveConfig, OverrideCoordinator, VersionPolicy};
use tempfile::TempDir;

fn write_layout(root: &std::path::Path, versions: &[&str]) {
    for version in versions {
        fs::create_dir_all(root.join("toolchain/lib/gcc/arm-none-eabi").join(version)).unwrap();
        fs::create_dir_all(root.join("toolchain/arm-none-eabi/include/c++").join(version)).unwrap();
    }
}

#[test]
fn test_pass_over_files_persists_user_layer() {
    let dir = TempDir::new().unwrap();
    let prefix = dir.path().join("ide");
    write_layout(&prefix, &["12.3.1", "13.2.1"]);

    let config_path = dir.path().join("config.toml");
    fs::write(
        &config_path,
        format!(
            "install_prefix = {:?}\nversion_policy = \"highest\"\n\n[exclusion]\npattern = \"**/.ide-cache\"\n",
            prefix.to_string_lossy()
        ),
    )
    .unwrap();

    let schema_path = dir.path().join("schema.json");
    fs::write(
        &schema_path,
        r#"{
            "files.exclude": { "default": { "**/.git": true }, "category": "files" },
            "cmake.generator": { "default": "Unix Makefiles", "category": "cmake" },
            "editor.cursorStyle": { "default": "block" },
            "C_Cpp.default.includePath": { "default": [] }
        }"#,
    )
    .unwrap();

    let settings_path = dir.path().join("settings.json");
    fs::write(&settings_path, r#"{ "editor.cursorStyle": "underline" }"#).unwrap();

    let config = EffectiveConfig::build(Some(&config_path), None).unwrap();
    let settings = config.settings().unwrap();
    assert_eq!(settings.version_policy, VersionPolicy::Highest);

    let resolver = build_resolver(&settings).unwrap();
    let registry = MemoryRegistry::from_schema_file(&schema_path).unwrap();
    let mut store = MemoryStore::load_user_file(&settings_path).unwrap();
    registry.seed_defaults(&mut store);

    let mut coordinator =
        OverrideCoordinator::new(store, registry, resolver).with_exclusion(settings.exclusion);
    let report = coordinator.activate();
    assert_eq!(report.failures().count(), 0);
    coordinator.store().save_user_file(&settings_path).unwrap();

    let saved = MemoryStore::load_user_file(&settings_path).unwrap();
    assert_eq!(saved.user_value("editor.cursorStyle"), Some(&json!("underline")));
    assert_eq!(saved.user_value("cmake.generator"), Some(&json!("Ninja")));
    assert_eq!(
        saved.user_value("files.exclude"),
        Some(&json!({ "**/.git": true, "**/.ide-cache": true }))
    );

    let include = saved.user_value("C_Cpp.default.includePath").unwrap();
    let first = include[0].as_str().unwrap();
    assert!(first.contains("13.2.1"), "highest version expected, got {}", first);

    assert_eq!(coordinator.categories().keys("cmake"), ["cmake.generator"]);
}
