//! Trash commands

use clap::{Args, Subcommand};

use kinfolk_core::{EntityKind, Genealogy};

use crate::output::{print_json, OutputFormat};
use crate::{AppContext, Cli};

#[derive(Args)]
pub struct TrashArgs {
    #[command(subcommand)]
    pub command: TrashCommands,
}

#[derive(Subcommand)]
pub enum TrashCommands {
    /// List deleted records, most recently deleted first
    List,
    /// Take a record out of the trash
    Restore {
        /// person, family, event or document
        kind: EntityKind,
        id: i64,
    },
    /// Permanently remove a trashed record
    Purge {
        /// person, family, event or document
        kind: EntityKind,
        id: i64,
    },
}

pub async fn run(args: &TrashArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    match &args.command {
        TrashCommands::List => {
            let entries = ctx.store.trash().await?;
            match cli.output() {
                OutputFormat::Json => print_json(&entries)?,
                OutputFormat::Table if entries.is_empty() => println!("Trash is empty"),
                OutputFormat::Table => {
                    println!("Trash ({}):", entries.len());
                    for entry in &entries {
                        println!(
                            "  {:<14} {} (deleted {})",
                            entry.entity.to_string(),
                            entry.label,
                            entry.deleted_at.format("%Y-%m-%d %H:%M")
                        );
                    }
                }
            }
        }
        TrashCommands::Restore { kind, id } => {
            let entity = kind.with_id(*id);
            ctx.store.restore(entity).await?;
            ctx.after_mutation("trash restore");
            if !cli.quiet {
                println!("Restored {}", entity);
            }
        }
        TrashCommands::Purge { kind, id } => {
            let entity = kind.with_id(*id);
            ctx.store.purge(entity).await?;
            ctx.after_mutation("trash purge");
            if !cli.quiet {
                println!("Permanently removed {}", entity);
            }
        }
    }

    Ok(())
}
