//! Settings Override CLI
//!
//! Entry point for the `settings-override` command-line tool.

use clap::{Parser, Subcommand, ValueEnum};
use override_host::{Inspection, MemoryRegistry, MemoryStore};
use settings_override::config::{default_config_path, EffectiveConfig};
use settings_override::{build_resolver, Outcome, OverrideCoordinator, Strategy, VersionPolicy};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "SETTINGS_OVERRIDE_LOG";

#[derive(Parser)]
#[command(name = "settings-override")]
#[command(about = "Apply toolchain-derived overrides to editor settings", version)]
struct Cli {
    /// Path to engine config file (default: ~/.config/settings-override/config.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Install prefix the toolchain, SDK and packages live under
    #[arg(long, global = true)]
    prefix: Option<PathBuf>,

    /// Toolchain root, overriding the one derived from the prefix
    #[arg(long, global = true)]
    toolchain: Option<PathBuf>,

    /// How to choose among several installed toolchain versions
    #[arg(long, global = true, value_enum)]
    policy: Option<PolicyArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an override pass over a settings file
    Apply {
        /// User settings file (JSON object); created if missing
        #[arg(long, short = 's')]
        settings: PathBuf,

        /// Key schema file mapping each key to its default and category
        #[arg(long)]
        schema: PathBuf,

        /// Compute the pass without writing the settings file
        #[arg(long)]
        dry_run: bool,

        /// Output the pass report in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show the strategy for a key and what it evaluates to
    Explain {
        /// Settings key
        key: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List every key with a registered strategy
    List {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the effective engine configuration
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Highest,
    FirstListed,
}

impl From<PolicyArg> for VersionPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Highest => VersionPolicy::Highest,
            PolicyArg::FirstListed => VersionPolicy::FirstListed,
        }
    }
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let config = load_config(&cli);

    match cli.command {
        Commands::Apply {
            settings,
            schema,
            dry_run,
            json,
        } => run_apply(&config, settings, schema, dry_run, json),
        Commands::Explain { key, json } => run_explain(&config, &key, json),
        Commands::List { json } => run_list(&config, json),
        Commands::Config => print_json(&config),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> EffectiveConfig {
    let path = match cli.config.clone() {
        Some(path) => Some(path),
        None => default_config_path().ok(),
    };

    let mut overrides = serde_json::Map::new();
    if let Some(ref prefix) = cli.prefix {
        overrides.insert("install_prefix".to_string(), serde_json::json!(prefix));
    }
    if let Some(ref toolchain) = cli.toolchain {
        overrides.insert("roots".to_string(), serde_json::json!({ "toolchain": toolchain }));
    }
    if let Some(policy) = cli.policy {
        overrides.insert(
            "version_policy".to_string(),
            serde_json::json!(VersionPolicy::from(policy)),
        );
    }
    let overrides = (!overrides.is_empty()).then(|| serde_json::Value::Object(overrides));

    match EffectiveConfig::build(path.as_deref(), overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }
    }
}

fn run_apply(config: &EffectiveConfig, settings_path: PathBuf, schema_path: PathBuf, dry_run: bool, json: bool) {
    let settings = exit_on_error("Invalid config", config.settings());
    let resolver = exit_on_error("Error building strategy table", build_resolver(&settings));
    let registry = exit_on_error(
        "Error loading key schema",
        MemoryRegistry::from_schema_file(&schema_path),
    );
    let mut store = exit_on_error(
        "Error loading settings",
        MemoryStore::load_user_file(&settings_path),
    );
    registry.seed_defaults(&mut store);

    let mut coordinator =
        OverrideCoordinator::new(store, registry, resolver).with_exclusion(settings.exclusion);
    let report = coordinator.activate();

    if !dry_run {
        if let Err(e) = coordinator.store().save_user_file(&settings_path) {
            eprintln!("Error writing {}: {}", settings_path.display(), e);
            process::exit(1);
        }
    }

    if json {
        print_json(&report);
    } else {
        for key in &report.keys {
            println!("  {:<40} {}", key.key, key.status.label());
        }
        println!();
        println!("{}", report.human_summary());
        if dry_run {
            println!("Dry run: {} not modified", settings_path.display());
        }
    }

    if report.failures().next().is_some() {
        process::exit(2);
    }
}

fn run_explain(config: &EffectiveConfig, key: &str, json: bool) {
    let settings = exit_on_error("Invalid config", config.settings());
    let resolver = exit_on_error("Error building strategy table", build_resolver(&settings));

    let Some(strategy) = resolver.lookup(key) else {
        eprintln!("No override strategy registered for '{}'", key);
        process::exit(1);
    };

    // Evaluate as if the user never set the key.
    let evaluated = resolver.evaluate_strategy(strategy, &Inspection::default());

    if json {
        let result = match &evaluated {
            Ok(Outcome::Replace(value)) => serde_json::json!({ "value": value }),
            Ok(Outcome::Unchanged) => serde_json::json!({ "value": null }),
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        };
        print_json(&serde_json::json!({
            "key": key,
            "strategy": strategy,
            "result": result,
        }));
        return;
    }

    println!("{}", key);
    println!("  Strategy: {}", strategy.kind());
    match strategy {
        Strategy::SetIfAbsent(value) => println!("  Applies when unset: {}", value),
        Strategy::Force(value) => println!("  Always set to: {}", value),
        Strategy::Computed(_) => {}
    }
    match evaluated {
        Ok(Outcome::Replace(value)) => println!("  Resolves to: {}", value),
        Ok(Outcome::Unchanged) => println!("  Resolves to: (unchanged)"),
        Err(e) => {
            println!("  Cannot resolve: {}", e);
            process::exit(1);
        }
    }
}

fn run_list(config: &EffectiveConfig, json: bool) {
    let settings = exit_on_error("Invalid config", config.settings());
    let resolver = exit_on_error("Error building strategy table", build_resolver(&settings));
    let table = resolver.table();

    if json {
        let entries: Vec<serde_json::Value> = table
            .iter()
            .map(|(key, strategy)| serde_json::json!({ "key": key, "strategy": strategy }))
            .collect();
        print_json(&entries);
        return;
    }

    println!("Override strategies ({} total):\n", table.len());
    for (key, strategy) in table.iter() {
        println!("  {:<40} {}", key, strategy.kind());
    }
    println!();
    println!(
        "Exclusion: '{}' kept in {}",
        settings.exclusion.pattern, settings.exclusion.key
    );
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}

fn exit_on_error<T, E: std::fmt::Display>(context: &str, result: Result<T, E>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            eprintln!("{}: {}", context, e);
            process::exit(1);
        }
    }
}
