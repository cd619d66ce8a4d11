//! Search command

use clap::Args;

use kinfolk_core::query::MIN_QUERY_LEN;
use kinfolk_core::{Gender, Genealogy, PersonQuery};
use kinfolk_search::{ExactSearchEngine, FuzzySearchEngine, SearchEngine};

use crate::output::{person_line, print_json, OutputFormat};
use crate::{AppContext, Cli};

#[derive(Args)]
pub struct SearchArgs {
    /// Text matched against every name part
    pub query: String,

    /// Enable fuzzy search
    #[arg(long)]
    pub fuzzy: bool,

    /// Filter by gender
    #[arg(short, long)]
    pub gender: Option<Gender>,

    /// Only living persons
    #[arg(long, conflicts_with = "deceased")]
    pub living: bool,

    /// Only deceased persons
    #[arg(long)]
    pub deceased: bool,

    /// Limit results
    #[arg(short, long, default_value = "20")]
    pub limit: usize,

    #[arg(long, default_value = "0")]
    pub offset: usize,
}

pub async fn run(args: &SearchArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let mut query = PersonQuery::new(args.query.as_str())
        .with_limit(args.limit)
        .with_offset(args.offset);
    if let Some(gender) = args.gender {
        query = query.with_gender(gender);
    }
    if args.living {
        query = query.living(true);
    } else if args.deceased {
        query = query.living(false);
    }

    if query.search_text().is_none() {
        anyhow::bail!(
            "Search text must be at least {} characters",
            MIN_QUERY_LEN
        );
    }

    let persons = ctx.store.persons().await?;
    let hits = if args.fuzzy {
        FuzzySearchEngine::new().search(&query, &persons).await?
    } else {
        ExactSearchEngine::new().search(&query, &persons).await?
    };
    tracing::info!("Found {} matches for '{}'", hits.len(), args.query);

    match cli.output() {
        OutputFormat::Json => print_json(&hits)?,
        OutputFormat::Table if hits.is_empty() => println!("No matches for '{}'", args.query),
        OutputFormat::Table => {
            println!("Matches for '{}' ({}):", args.query, hits.len());
            for hit in &hits {
                println!("  {:>5.2}  {}", hit.score, person_line(&hit.person));
            }
        }
    }
    Ok(())
}
