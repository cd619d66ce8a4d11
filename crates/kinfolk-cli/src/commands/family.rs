//! Family commands

use chrono::NaiveDate;
use clap::{Args, Subcommand};

use kinfolk_core::{
    FamilyId, FamilyPatch, Genealogy, KinshipGraph, NewFamily, PersonId, RelationshipType,
    UnionStatus,
};

use super::{clearable, parse_date_arg};
use crate::output::{family_line, person_line, print_json, OutputFormat};
use crate::{AppContext, Cli};

#[derive(Args)]
pub struct FamilyArgs {
    #[command(subcommand)]
    pub command: FamilyCommands,
}

#[derive(Subcommand)]
pub enum FamilyCommands {
    /// Add a family; either partner may be omitted
    Add {
        /// First partner
        #[arg(long)]
        partner1: Option<PersonId>,
        /// Second partner
        #[arg(long)]
        partner2: Option<PersonId>,
        /// marriage, civil_partnership, partnership, engagement, relationship, casual, unknown
        #[arg(short, long)]
        relationship: Option<RelationshipType>,
        /// active, divorced, widowed, separated, annulled, ended
        #[arg(short, long)]
        status: Option<UnionStatus>,
        #[arg(long, value_parser = parse_date_arg)]
        start: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date_arg)]
        end: Option<NaiveDate>,
        #[arg(long)]
        end_reason: Option<String>,
        #[arg(short, long)]
        place: Option<String>,
        #[arg(short, long)]
        notes: Option<String>,
        /// Children to attach (repeatable)
        #[arg(short, long = "child")]
        children: Vec<PersonId>,
    },
    /// Get family details with its children
    Get {
        id: FamilyId,
    },
    /// List families
    List {
        /// Only families this person is a partner in
        #[arg(long)]
        person: Option<PersonId>,
    },
    /// Update a family; an empty text value clears the field
    Update {
        id: FamilyId,
        #[arg(long, conflicts_with = "no_partner1")]
        partner1: Option<PersonId>,
        #[arg(long)]
        no_partner1: bool,
        #[arg(long, conflicts_with = "no_partner2")]
        partner2: Option<PersonId>,
        #[arg(long)]
        no_partner2: bool,
        #[arg(short, long)]
        relationship: Option<RelationshipType>,
        #[arg(short, long)]
        status: Option<UnionStatus>,
        #[arg(long, value_parser = parse_date_arg)]
        start: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date_arg, conflicts_with = "clear_end")]
        end: Option<NaiveDate>,
        /// Forget the end date
        #[arg(long)]
        clear_end: bool,
        #[arg(long)]
        end_reason: Option<String>,
        #[arg(short, long)]
        place: Option<String>,
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Detach the family's children and move it to the trash
    Delete {
        id: FamilyId,
    },
    /// Record a person as a child of the family
    AddChild {
        family: FamilyId,
        child: PersonId,
    },
    /// Detach a person from their parent family
    RemoveChild {
        child: PersonId,
    },
}

pub async fn run(args: &FamilyArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let format = cli.output();

    match &args.command {
        FamilyCommands::Add {
            partner1,
            partner2,
            relationship,
            status,
            start,
            end,
            end_reason,
            place,
            notes,
            children,
        } => {
            let new = NewFamily {
                partner1: *partner1,
                partner2: *partner2,
                relationship: relationship.unwrap_or_default(),
                status: status.unwrap_or_default(),
                start_date: *start,
                end_date: *end,
                end_reason: end_reason.clone(),
                place: place.clone(),
                notes: notes.clone(),
            };
            let children = children.clone();

            // The family and its children commit together or not at all
            let family = ctx
                .store
                .transact(move |tx| {
                    let family = tx.create_family(new)?;
                    for child in children {
                        tx.attach_child(family.id, child)?;
                    }
                    Ok(family)
                })
                .await?;
            ctx.after_mutation("family add");

            match format {
                OutputFormat::Json => print_json(&family)?,
                OutputFormat::Table => {
                    let tree = ctx.store.snapshot().await?;
                    println!("Created family {}", family_line(&family, &tree));
                }
            }
        }
        FamilyCommands::Get { id } => {
            let tree = ctx.store.snapshot().await?;
            let graph = KinshipGraph::new(&tree);
            let family = graph.family(*id)?;
            let children = graph.children_of_family(*id)?;
            let adoptees = graph.adoptees_of(*id)?;

            if format == OutputFormat::Json {
                return print_json(&serde_json::json!({
                    "family": family,
                    "children": children,
                    "adoptees": adoptees,
                }));
            }

            println!("Family: {}", family_line(family, &tree));
            if let Some(date) = family.start_date {
                println!("  Started: {}", date);
            }
            if let Some(date) = family.end_date {
                match &family.end_reason {
                    Some(reason) => println!("  Ended: {} ({})", date, reason),
                    None => println!("  Ended: {}", date),
                }
            }
            if let Some(place) = &family.place {
                println!("  Place: {}", place);
            }
            if let Some(notes) = &family.notes {
                println!("  Notes: {}", notes);
            }
            if !children.is_empty() {
                println!("  Children:");
                for child in &children {
                    println!("    {}", person_line(child));
                }
            }
            if !adoptees.is_empty() {
                println!("  Adopted children:");
                for child in &adoptees {
                    println!("    {}", person_line(child));
                }
            }
        }
        FamilyCommands::List { person } => {
            let tree = ctx.store.snapshot().await?;
            let families: Vec<_> = match person {
                Some(id) => KinshipGraph::new(&tree).families_of(*id)?,
                None => tree.live_families().collect(),
            };

            match format {
                OutputFormat::Json => print_json(&families)?,
                OutputFormat::Table if families.is_empty() => println!("No families found"),
                OutputFormat::Table => {
                    println!("Families ({}):", families.len());
                    for family in &families {
                        println!("  {}", family_line(family, &tree));
                    }
                }
            }
        }
        FamilyCommands::Update {
            id,
            partner1,
            no_partner1,
            partner2,
            no_partner2,
            relationship,
            status,
            start,
            end,
            clear_end,
            end_reason,
            place,
            notes,
        } => {
            let mut patch = FamilyPatch::new();
            if *no_partner1 {
                patch.partner1 = Some(None);
            } else if let Some(partner) = partner1 {
                patch.partner1 = Some(Some(*partner));
            }
            if *no_partner2 {
                patch.partner2 = Some(None);
            } else if let Some(partner) = partner2 {
                patch.partner2 = Some(Some(*partner));
            }
            patch.relationship = *relationship;
            patch.status = *status;
            patch.start_date = (*start).map(Some);
            if *clear_end {
                patch.end_date = Some(None);
            } else if let Some(date) = end {
                patch.end_date = Some(Some(*date));
            }
            patch.end_reason = clearable(end_reason);
            patch.place = clearable(place);
            patch.notes = clearable(notes);

            let family = ctx.store.update_family(*id, patch).await?;
            ctx.after_mutation("family update");

            match format {
                OutputFormat::Json => print_json(&family)?,
                OutputFormat::Table => {
                    let tree = ctx.store.snapshot().await?;
                    println!("Updated family {}", family_line(&family, &tree));
                }
            }
        }
        FamilyCommands::Delete { id } => {
            ctx.store.delete_family(*id).await?;
            ctx.after_mutation("family delete");
            if !cli.quiet {
                println!("Moved family #{} to the trash", id);
            }
        }
        FamilyCommands::AddChild { family, child } => {
            let person = ctx.store.attach_child(*family, *child).await?;
            ctx.after_mutation("family add-child");
            match format {
                OutputFormat::Json => print_json(&person)?,
                OutputFormat::Table => {
                    println!("Added {} to family #{}", person_line(&person), family)
                }
            }
        }
        FamilyCommands::RemoveChild { child } => {
            let person = ctx.store.detach_child(*child).await?;
            ctx.after_mutation("family remove-child");
            match format {
                OutputFormat::Json => print_json(&person)?,
                OutputFormat::Table => {
                    println!("Detached {} from their parent family", person_line(&person))
                }
            }
        }
    }

    Ok(())
}
