//! Kinfolk CLI - Command line interface for the family tree

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod gedcom;
mod output;

use commands::{backup, completions, document, event, family, io, person, search, trash, tree};
use config::{BackendKind, Config};
use kinfolk_storage::{BackupManager, RedbStorage, SqliteStorage, StorageBackend, TreeStore};

#[derive(Parser)]
#[command(name = "kinfolk")]
#[command(author, version, about = "Personal family tree manager")]
pub struct Cli {
    /// Data directory
    #[arg(short, long, env = "KINFOLK_DATA_DIR", global = true)]
    pub data_dir: Option<String>,

    /// Storage backend (defaults to the configured one)
    #[arg(long, value_enum, global = true)]
    pub backend: Option<BackendKind>,

    /// Output format: table, json
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Get the data directory path
    pub fn data_dir(&self, config: &Config) -> PathBuf {
        self.data_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| config.data_dir())
    }

    pub fn backend(&self, config: &Config) -> BackendKind {
        self.backend.unwrap_or(config.backend)
    }

    pub fn output(&self) -> output::OutputFormat {
        output::OutputFormat::from(self.format.as_str())
    }

    /// Database file for the selected backend
    pub fn database_path(&self, config: &Config) -> PathBuf {
        self.data_dir(config)
            .join(self.backend(config).file_name())
    }

    pub fn backup_dir(&self, config: &Config) -> PathBuf {
        self.data_dir(config).join("backups")
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage persons
    Person(person::PersonArgs),
    /// Manage families (unions and their children)
    Family(family::FamilyArgs),
    /// Manage life events
    Event(event::EventArgs),
    /// Manage documents and media
    Document(document::DocumentArgs),
    /// Kinship and lineage queries
    Tree(tree::TreeArgs),
    /// Inspect, restore and purge deleted records
    Trash(trash::TrashArgs),
    /// Search persons by name
    Search(search::SearchArgs),
    /// Export the tree as JSON or GEDCOM
    Export(io::ExportArgs),
    /// Import a JSON export
    Import(io::ImportArgs),
    /// Manage database backups
    Backup(backup::BackupArgs),
    /// Manage CLI configuration
    Config(commands::config::ConfigArgs),
    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Application context with the opened tree
pub struct AppContext {
    pub store: TreeStore<dyn StorageBackend>,
    pub config: Config,
    /// Present when automatic backups are enabled
    backups: Option<BackupManager>,
    /// What the last successful mutation did, if any
    mutated: Mutex<Option<String>>,
}

impl AppContext {
    pub async fn new(cli: &Cli, config: Config) -> anyhow::Result<Self> {
        let data_dir = cli.data_dir(&config);
        std::fs::create_dir_all(&data_dir)?;

        let db_path = cli.database_path(&config);
        tracing::debug!("Using database at: {:?}", db_path);

        let backend: Arc<dyn StorageBackend> = match cli.backend(&config) {
            BackendKind::Redb => Arc::new(RedbStorage::open(&db_path)?),
            BackendKind::Sqlite => Arc::new(SqliteStorage::open(&db_path)?),
        };
        backend.initialize().await?;

        let backups = if config.backup.enabled {
            let manager = BackupManager::new(cli.backup_dir(&config), &db_path)?
                .with_interval(Duration::from_secs(config.backup.interval_secs))
                .with_max_backups(config.backup.max_backups);
            Some(manager)
        } else {
            None
        };

        Ok(Self {
            store: TreeStore::new(backend),
            config,
            backups,
            mutated: Mutex::new(None),
        })
    }

    /// Note a successful mutation; the automatic backup runs in [`AppContext::finish`]
    pub fn after_mutation(&self, what: &str) {
        let mut mutated = match self.mutated.lock() {
            Ok(mutated) => mutated,
            Err(poisoned) => poisoned.into_inner(),
        };
        *mutated = Some(what.to_string());
    }

    /// Close the database, then take a throttled automatic backup if
    /// anything changed.
    ///
    /// A failed backup never fails the command that triggered it.
    pub async fn finish(self) -> anyhow::Result<()> {
        self.store.backend().close().await?;
        let Self {
            store,
            backups,
            mutated,
            ..
        } = self;
        // The database file must be released before it is copied
        drop(store);

        let what = match mutated.into_inner() {
            Ok(what) => what,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let (Some(mut manager), Some(what)) = (backups, what) {
            match manager.auto_backup(Some(&what)) {
                Ok(Some(info)) => tracing::info!("Automatic backup {}", info.name),
                Ok(None) => {}
                Err(e) => tracing::warn!("Automatic backup failed: {}", e),
            }
        }
        Ok(())
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    // These never open the database
    match &cli.command {
        Commands::Config(args) => return commands::config::run(args).await,
        Commands::Completions(args) => return completions::run(args),
        _ => {}
    }

    let config = Config::load()?;
    if let Commands::Backup(args) = &cli.command {
        return backup::run(args, cli, &config).await;
    }

    let ctx = AppContext::new(cli, config).await?;

    match &cli.command {
        Commands::Person(args) => person::run(args, cli, &ctx).await?,
        Commands::Family(args) => family::run(args, cli, &ctx).await?,
        Commands::Event(args) => event::run(args, cli, &ctx).await?,
        Commands::Document(args) => document::run(args, cli, &ctx).await?,
        Commands::Tree(args) => tree::run(args, cli, &ctx).await?,
        Commands::Trash(args) => trash::run(args, cli, &ctx).await?,
        Commands::Search(args) => search::run(args, cli, &ctx).await?,
        Commands::Export(args) => io::run_export(args, cli, &ctx).await?,
        Commands::Import(args) => io::run_import(args, cli, &ctx).await?,
        Commands::Backup(_) | Commands::Config(_) | Commands::Completions(_) => {}
    }

    ctx.finish().await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    tracing::debug!("Starting kinfolk CLI");

    if let Err(err) = run(&cli).await {
        match err.downcast_ref::<kinfolk_core::Error>() {
            Some(core) => eprintln!("error[{}]: {}", core.code(), core),
            None => eprintln!("error: {:#}", err),
        }
        std::process::exit(1);
    }
}
