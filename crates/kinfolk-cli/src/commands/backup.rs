//! Backup commands
//!
//! These run without opening the tree, so a restore can replace the
//! database file.

use std::time::Duration;

use clap::{Args, Subcommand};

use kinfolk_storage::{BackupManager, BackupTrigger};

use crate::config::Config;
use crate::output::{print_json, OutputFormat};
use crate::Cli;

#[derive(Args)]
pub struct BackupArgs {
    #[command(subcommand)]
    pub command: BackupCommands,
}

#[derive(Subcommand)]
pub enum BackupCommands {
    /// Back up the database now
    Create {
        /// What the backup is for
        #[arg(long)]
        description: Option<String>,
    },
    /// List backups, newest first
    List,
    /// Replace the database with a backup (a safety copy is taken first)
    Restore {
        /// Backup file name as shown by `backup list`
        name: String,
    },
    /// Delete a backup
    Delete {
        name: String,
    },
    /// Backup counts and sizes
    Stats,
    /// Delete the oldest backups beyond the configured maximum
    Prune,
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

pub async fn run(args: &BackupArgs, cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let format = cli.output();
    let mut manager = BackupManager::new(cli.backup_dir(config), cli.database_path(config))?
        .with_interval(Duration::from_secs(config.backup.interval_secs))
        .with_max_backups(config.backup.max_backups);

    match &args.command {
        BackupCommands::Create { description } => {
            let info = manager.create_backup(BackupTrigger::Manual, description.as_deref())?;
            match format {
                OutputFormat::Json => print_json(&info)?,
                OutputFormat::Table => {
                    println!("Created backup {} ({})", info.name, format_size(info.size))
                }
            }
        }
        BackupCommands::List => {
            let backups = manager.list_backups()?;
            match format {
                OutputFormat::Json => print_json(&backups)?,
                OutputFormat::Table if backups.is_empty() => println!("No backups found"),
                OutputFormat::Table => {
                    println!("Backups in {} ({}):", manager.dir().display(), backups.len());
                    for backup in &backups {
                        let trigger = backup
                            .trigger
                            .map(|t| t.to_string())
                            .unwrap_or_else(|| "unknown".to_string());
                        print!(
                            "  {}  {}  {:>9}  {}",
                            backup.name,
                            backup.created_at.format("%Y-%m-%d %H:%M:%S"),
                            format_size(backup.size),
                            trigger
                        );
                        if let Some(description) = &backup.description {
                            print!("  {}", description);
                        }
                        println!();
                    }
                }
            }
        }
        BackupCommands::Restore { name } => {
            let safety = manager.restore_backup(name)?;
            match format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "restored": name,
                    "safety_backup": safety,
                }))?,
                OutputFormat::Table => {
                    println!("Restored database from {}", name);
                    if let Some(safety) = safety {
                        println!("Previous database saved as {}", safety.name);
                    }
                }
            }
        }
        BackupCommands::Delete { name } => {
            manager.delete_backup(name)?;
            if !cli.quiet {
                println!("Deleted backup {}", name);
            }
        }
        BackupCommands::Stats => {
            let stats = manager.stats()?;
            match format {
                OutputFormat::Json => print_json(&stats)?,
                OutputFormat::Table => {
                    let when = |t: Option<chrono::DateTime<chrono::Utc>>| {
                        t.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                            .unwrap_or_else(|| "never".to_string())
                    };
                    println!("Backups:      {} (max {})", stats.count, stats.max_backups);
                    println!("Total size:   {}", format_size(stats.total_size));
                    println!("Oldest:       {}", when(stats.oldest));
                    println!("Newest:       {}", when(stats.newest));
                    println!("Last auto:    {}", when(stats.last_auto));
                    println!("Auto interval: {}s", stats.interval_secs);
                }
            }
        }
        BackupCommands::Prune => {
            let removed = manager.prune()?;
            if !cli.quiet {
                println!("Removed {} old backups", removed);
            }
        }
    }

    Ok(())
}
