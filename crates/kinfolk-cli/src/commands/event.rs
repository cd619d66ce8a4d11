//! Life event commands

use chrono::NaiveDate;
use clap::{Args, Subcommand};

use kinfolk_core::{EventId, EventKind, Genealogy, NewEvent, PersonId};

use super::parse_date_arg;
use crate::output::{print_json, OutputFormat};
use crate::{AppContext, Cli};

#[derive(Args)]
pub struct EventArgs {
    #[command(subcommand)]
    pub command: EventCommands,
}

#[derive(Subcommand)]
pub enum EventCommands {
    /// Record an event in a person's life
    Add {
        person: PersonId,
        /// baptism, confirmation, graduation, military, immigration,
        /// emigration, residence, occupation, burial, other
        kind: EventKind,
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
        #[arg(short, long)]
        place: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// List a person's events, oldest first
    List {
        person: PersonId,
    },
    /// Move an event to the trash
    Delete {
        id: EventId,
    },
}

pub async fn run(args: &EventArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let format = cli.output();

    match &args.command {
        EventCommands::Add {
            person,
            kind,
            date,
            place,
            description,
        } => {
            let new = NewEvent {
                person: *person,
                kind: *kind,
                date: *date,
                place: place.clone(),
                description: description.clone(),
            };
            let event = ctx.store.create_event(new).await?;
            ctx.after_mutation("event add");

            match format {
                OutputFormat::Json => print_json(&event)?,
                OutputFormat::Table => {
                    println!("Recorded {} #{} for person #{}", event.kind, event.id, person)
                }
            }
        }
        EventCommands::List { person } => {
            let events = ctx.store.events_for(*person).await?;
            match format {
                OutputFormat::Json => print_json(&events)?,
                OutputFormat::Table if events.is_empty() => {
                    println!("No events recorded for person #{}", person)
                }
                OutputFormat::Table => {
                    println!("Events of person #{} ({}):", person, events.len());
                    for event in &events {
                        let date = event
                            .date
                            .map(|d| d.to_string())
                            .unwrap_or_else(|| "undated".to_string());
                        print!("  #{} {} {}", event.id, date, event.kind);
                        if let Some(place) = &event.place {
                            print!(" at {}", place);
                        }
                        if let Some(description) = &event.description {
                            print!(": {}", description);
                        }
                        println!();
                    }
                }
            }
        }
        EventCommands::Delete { id } => {
            ctx.store.delete_event(*id).await?;
            ctx.after_mutation("event delete");
            if !cli.quiet {
                println!("Moved event #{} to the trash", id);
            }
        }
    }

    Ok(())
}
