//! Config command for managing CLI configuration

use clap::{Args, Subcommand};

use crate::config::{config_file_path, Config};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Get a config value
    Get {
        /// data_dir, backend, default_max_depth, backup.enabled,
        /// backup.interval_secs or backup.max_backups
        key: String,
    },
    /// Set a config value
    Set {
        key: String,
        value: String,
    },
    /// Put a key back to its default value
    Reset {
        key: String,
    },
    /// List all config values and the database they select
    List,
    /// Show config file path
    Path,
    /// Initialize default config file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

pub async fn run(args: &ConfigArgs) -> anyhow::Result<()> {
    match &args.command {
        ConfigCommands::Get { key } => run_get(key),
        ConfigCommands::Set { key, value } => run_set(key, value),
        ConfigCommands::Reset { key } => run_reset(key),
        ConfigCommands::List => run_list(),
        ConfigCommands::Path => run_path(),
        ConfigCommands::Init { force } => run_init(*force),
    }
}

fn run_get(key: &str) -> anyhow::Result<()> {
    let config = Config::load()?;
    match config.get(key) {
        Some(value) => println!("{}", value),
        None => anyhow::bail!(
            "Unknown config key: {}. Available keys: {}",
            key,
            Config::keys().join(", ")
        ),
    }
    Ok(())
}

fn run_set(key: &str, value: &str) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    let before = config.database_path();
    config.set(key, value)?;
    config.save()?;
    println!("Set {} = {}", key, config.get(key).unwrap_or_default());
    warn_on_moved_database(&before, &config);
    Ok(())
}

fn run_reset(key: &str) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    let before = config.database_path();
    config.reset(key)?;
    config.save()?;
    println!("Reset {} = {}", key, config.get(key).unwrap_or_default());
    warn_on_moved_database(&before, &config);
    Ok(())
}

/// Switching backend or data directory does not carry the tree along
fn warn_on_moved_database(before: &std::path::Path, config: &Config) {
    let after = config.database_path();
    if after != before && before.exists() && !after.exists() {
        eprintln!(
            "warning: the tree in {} is not moved; export it and import into the new database",
            before.display()
        );
    }
}

fn run_list() -> anyhow::Result<()> {
    let config = Config::load()?;
    println!("Config file: {}", config_file_path().display());
    println!("Database:    {}", config.database_path().display());
    println!();
    for key in Config::keys() {
        let value = config.get(key).unwrap_or_else(|| "(not set)".to_string());
        println!("{} = {}", key, value);
    }
    Ok(())
}

fn run_path() -> anyhow::Result<()> {
    println!("{}", config_file_path().display());
    Ok(())
}

fn run_init(force: bool) -> anyhow::Result<()> {
    let path = config_file_path();

    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    let config = Config::default();
    config.save()?;
    println!("Created config file at {}", path.display());
    Ok(())
}
