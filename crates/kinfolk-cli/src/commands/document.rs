//! Document commands

use clap::{Args, Subcommand};

use kinfolk_core::{DocumentId, DocumentKind, Genealogy, NewDocument, PersonId};

use crate::output::{print_json, OutputFormat};
use crate::{AppContext, Cli};

#[derive(Args)]
pub struct DocumentArgs {
    #[command(subcommand)]
    pub command: DocumentCommands,
}

#[derive(Subcommand)]
pub enum DocumentCommands {
    /// Register a document or media file
    Add {
        title: String,
        /// Where the file lives
        file_path: String,
        /// Person the document is about
        #[arg(long)]
        person: Option<PersonId>,
        /// photo, certificate, letter, record, other
        #[arg(short, long)]
        kind: Option<DocumentKind>,
        #[arg(long)]
        description: Option<String>,
        /// Media type hint such as "image" or "pdf"
        #[arg(long)]
        file_type: Option<String>,
    },
    /// List documents
    List {
        /// Only documents about this person
        #[arg(long)]
        person: Option<PersonId>,
    },
    /// Move a document to the trash
    Delete {
        id: DocumentId,
    },
}

pub async fn run(args: &DocumentArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let format = cli.output();

    match &args.command {
        DocumentCommands::Add {
            title,
            file_path,
            person,
            kind,
            description,
            file_type,
        } => {
            let new = NewDocument {
                person: *person,
                kind: kind.unwrap_or_default(),
                title: title.clone(),
                description: description.clone(),
                file_path: file_path.clone(),
                file_type: file_type.clone(),
            };
            let document = ctx.store.create_document(new).await?;
            ctx.after_mutation("document add");

            match format {
                OutputFormat::Json => print_json(&document)?,
                OutputFormat::Table => {
                    println!("Added document #{} {}", document.id, document.title)
                }
            }
        }
        DocumentCommands::List { person } => {
            let documents = match person {
                Some(id) => ctx.store.documents_for(*id).await?,
                None => ctx
                    .store
                    .snapshot()
                    .await?
                    .live_documents()
                    .cloned()
                    .collect(),
            };

            match format {
                OutputFormat::Json => print_json(&documents)?,
                OutputFormat::Table if documents.is_empty() => println!("No documents found"),
                OutputFormat::Table => {
                    println!("Documents ({}):", documents.len());
                    for document in &documents {
                        let about = document
                            .person
                            .map(|p| format!(" about #{}", p))
                            .unwrap_or_default();
                        println!(
                            "  #{} {} [{}] {}{}",
                            document.id, document.title, document.kind, document.file_path, about
                        );
                    }
                }
            }
        }
        DocumentCommands::Delete { id } => {
            ctx.store.delete_document(*id).await?;
            ctx.after_mutation("document delete");
            if !cli.quiet {
                println!("Moved document #{} to the trash", id);
            }
        }
    }

    Ok(())
}
