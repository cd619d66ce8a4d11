//! Kinship and lineage queries

use clap::{Args, Subcommand};

use kinfolk_core::{Genealogy, LineageReport, PersonId};

use crate::output::{person_line, print_json, print_people, OutputFormat};
use crate::{AppContext, Cli};

#[derive(Args)]
pub struct TreeArgs {
    #[command(subcommand)]
    pub command: TreeCommands,
}

#[derive(Subcommand)]
pub enum TreeCommands {
    /// Biological parents of a person
    Parents { id: PersonId },
    /// Children of a person, in birth order
    Children { id: PersonId },
    /// Everyone a person has formed a family with
    Partners { id: PersonId },
    /// Full siblings (same parent family)
    Siblings { id: PersonId },
    /// Siblings sharing exactly one parent
    HalfSiblings { id: PersonId },
    /// Partners of a person's adoptive family
    AdoptiveParents { id: PersonId },
    /// Ancestors up to a depth
    Ancestors {
        id: PersonId,
        /// Deepest generation to include (defaults to the configured depth)
        #[arg(long)]
        depth: Option<u32>,
    },
    /// Descendants up to a depth
    Descendants {
        id: PersonId,
        /// Deepest generation to include (defaults to the configured depth)
        #[arg(long)]
        depth: Option<u32>,
    },
    /// Topmost ancestor reached by following first parents
    Root { id: PersonId },
    /// Lay out the tree below a root person by generation
    Generations {
        /// Root person; defaults to the root found from this person
        id: PersonId,
        /// Use the person as given instead of walking up to the root first
        #[arg(long)]
        no_root: bool,
    },
    /// Summary counts
    Stats,
    /// Scan the stored tree for cycles and dangling links
    Check,
}

fn print_lineage(heading: &str, report: &LineageReport) {
    if report.entries.is_empty() {
        println!("{}: none", heading);
        return;
    }
    println!("{} ({}):", heading, report.entries.len());
    for entry in &report.entries {
        println!(
            "{}{} (generation {})",
            "  ".repeat(entry.depth as usize),
            person_line(&entry.person),
            entry.depth
        );
    }
    if report.stats.truncated {
        println!("(result truncated)");
    }
}

pub async fn run(args: &TreeArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let format = cli.output();
    let store = &ctx.store;

    let (heading, people) = match &args.command {
        TreeCommands::Parents { id } => ("Parents", store.parents_of(*id).await?),
        TreeCommands::Children { id } => {
            ("Children", store.relatives(*id).await?.children)
        }
        TreeCommands::Partners { id } => ("Partners", store.partners_of(*id).await?),
        TreeCommands::Siblings { id } => ("Siblings", store.siblings_of(*id).await?),
        TreeCommands::HalfSiblings { id } => {
            ("Half-siblings", store.half_siblings_of(*id).await?)
        }
        TreeCommands::AdoptiveParents { id } => {
            ("Adoptive parents", store.adoptive_parents_of(*id).await?)
        }
        TreeCommands::Ancestors { id, depth } => {
            let depth = depth.unwrap_or(ctx.config.default_max_depth);
            let report = store.ancestors_of(*id, depth).await?;
            tracing::info!(visited = report.stats.nodes_visited, "Walked ancestors");
            return match format {
                OutputFormat::Json => print_json(&report),
                OutputFormat::Table => {
                    print_lineage("Ancestors", &report);
                    Ok(())
                }
            };
        }
        TreeCommands::Descendants { id, depth } => {
            let depth = depth.unwrap_or(ctx.config.default_max_depth);
            let report = store.descendants_of(*id, depth).await?;
            tracing::info!(visited = report.stats.nodes_visited, "Walked descendants");
            return match format {
                OutputFormat::Json => print_json(&report),
                OutputFormat::Table => {
                    print_lineage("Descendants", &report);
                    Ok(())
                }
            };
        }
        TreeCommands::Root { id } => {
            let root = store.find_root(*id).await?;
            return match format {
                OutputFormat::Json => print_json(&root),
                OutputFormat::Table => {
                    println!("Root: {}", person_line(&root));
                    Ok(())
                }
            };
        }
        TreeCommands::Generations { id, no_root } => {
            let root = if *no_root {
                *id
            } else {
                store.find_root(*id).await?.id
            };
            let generations = store.assign_generations(root).await?;
            if format == OutputFormat::Json {
                return print_json(&generations);
            }
            let tree = store.snapshot().await?;
            for (number, row) in generations.rows().iter().enumerate() {
                println!("Generation {}:", number);
                for person in row.iter().filter_map(|id| tree.live_person(*id)) {
                    println!("  {}", person_line(person));
                }
            }
            return Ok(());
        }
        TreeCommands::Stats => {
            let stats = store.stats().await?;
            return match format {
                OutputFormat::Json => print_json(&stats),
                OutputFormat::Table => {
                    println!("Persons:     {}", stats.persons);
                    println!("  Living:    {}", stats.living);
                    println!("  Deceased:  {}", stats.deceased);
                    println!("  Male:      {}", stats.male);
                    println!("  Female:    {}", stats.female);
                    println!("  Unknown:   {}", stats.unknown_gender);
                    println!("Families:    {}", stats.families);
                    println!("Events:      {}", stats.events);
                    println!("Documents:   {}", stats.documents);
                    println!("Generations: {}", stats.generations);
                    println!("In trash:    {}", stats.trashed);
                    Ok(())
                }
            };
        }
        TreeCommands::Check => {
            store.check_integrity().await?;
            if !cli.quiet {
                println!("Tree is consistent");
            }
            return Ok(());
        }
    };

    match format {
        OutputFormat::Json => print_json(&people)?,
        OutputFormat::Table => print_people(heading, &people),
    }
    Ok(())
}
