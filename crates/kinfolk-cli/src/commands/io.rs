//! Import/Export commands

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

use chrono::{DateTime, Utc};
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};

use kinfolk_core::{
    Document, EntityRef, Event, Family, FamilyId, FamilyTree, Genealogy, NewDocument, NewEvent,
    NewFamily, NewPerson, Person, PersonId, PersonPatch, Transaction,
};

use crate::gedcom;
use crate::{AppContext, Cli};

const EXPORT_VERSION: &str = "1.0";

/// Export format
#[derive(Clone, Copy, Default, ValueEnum)]
pub enum ExportFormat {
    #[default]
    Json,
    Gedcom,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Output file (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Export format
    #[arg(short = 't', long = "type", default_value = "json")]
    pub kind: ExportFormat,
}

#[derive(Args)]
pub struct ImportArgs {
    /// Input file (JSON format)
    pub file: PathBuf,

    /// Add to a tree that already has persons (default: error if not empty)
    #[arg(long)]
    pub merge: bool,
}

/// Every live record, as written by `kinfolk export`
#[derive(Debug, Serialize)]
pub struct ExportData {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub persons: Vec<Person>,
    pub families: Vec<Family>,
    pub events: Vec<Event>,
    pub documents: Vec<Document>,
}

impl ExportData {
    /// Live records of `tree`, with every link to a trashed record cut so
    /// the file imports on its own
    pub fn from_tree(tree: &FamilyTree) -> Self {
        let live_person = |id: Option<PersonId>| id.filter(|id| tree.live_person(*id).is_some());
        let live_family = |id: Option<FamilyId>| id.filter(|id| tree.live_family(*id).is_some());

        let persons = tree
            .live_persons()
            .map(|person| {
                let mut person = person.clone();
                person.parent_family = live_family(person.parent_family);
                person.adoptive_family = live_family(person.adoptive_family);
                person
            })
            .collect();
        let families = tree
            .live_families()
            .map(|family| {
                let mut family = family.clone();
                family.partner1 = live_person(family.partner1);
                family.partner2 = live_person(family.partner2);
                family
            })
            .collect();
        let events = tree
            .live_events()
            .filter(|event| tree.live_person(event.person).is_some())
            .cloned()
            .collect();
        let documents = tree
            .live_documents()
            .map(|document| {
                let mut document = document.clone();
                document.person = live_person(document.person);
                document
            })
            .collect();

        Self {
            version: EXPORT_VERSION.to_string(),
            exported_at: Utc::now(),
            persons,
            families,
            events,
            documents,
        }
    }
}

/// Import file; ids are only meaningful within the file
#[derive(Debug, Deserialize)]
pub struct ImportData {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub persons: Vec<ImportPerson>,
    #[serde(default)]
    pub families: Vec<ImportFamily>,
    #[serde(default)]
    pub events: Vec<NewEvent>,
    #[serde(default)]
    pub documents: Vec<NewDocument>,
}

#[derive(Debug, Deserialize)]
pub struct ImportPerson {
    pub id: PersonId,
    #[serde(flatten)]
    pub person: NewPerson,
    #[serde(default)]
    pub parent_family_id: Option<FamilyId>,
    /// Older files name the parents instead of a family
    #[serde(default)]
    pub father_id: Option<PersonId>,
    #[serde(default)]
    pub mother_id: Option<PersonId>,
}

#[derive(Debug, Deserialize)]
pub struct ImportFamily {
    pub id: FamilyId,
    #[serde(flatten)]
    pub family: NewFamily,
}

#[derive(Debug, Default, Serialize)]
pub struct ImportSummary {
    pub persons: usize,
    pub families: usize,
    pub events: usize,
    pub documents: usize,
}

/// Persons awaiting their family links
struct PendingLinks {
    person: PersonId,
    parent_family: Option<FamilyId>,
    adoptive_family: Option<FamilyId>,
    father: Option<PersonId>,
    mother: Option<PersonId>,
}

/// Create every record of `data` in one transaction, mapping file ids to
/// newly assigned ones
pub fn import_records(
    tx: &mut Transaction<'_>,
    data: ImportData,
) -> kinfolk_core::Result<ImportSummary> {
    let mut summary = ImportSummary::default();
    let mut persons: HashMap<PersonId, PersonId> = HashMap::new();
    let mut families: HashMap<FamilyId, FamilyId> = HashMap::new();
    let mut pending = Vec::new();

    type PersonMap = HashMap<PersonId, PersonId>;
    let person_id = |map: &PersonMap, field: &'static str, old: PersonId| {
        map.get(&old)
            .copied()
            .ok_or(kinfolk_core::Error::DanglingReference {
                field,
                target: EntityRef::Person(old),
            })
    };

    for record in data.persons {
        let mut new = record.person;
        let parent_family = new.parent_family.take().or(record.parent_family_id);
        let adoptive_family = new.adoptive_family.take();
        let created = tx.create_person(new)?;
        persons.insert(record.id, created.id);
        pending.push(PendingLinks {
            person: created.id,
            parent_family,
            adoptive_family,
            father: record.father_id,
            mother: record.mother_id,
        });
        summary.persons += 1;
    }

    // Families created here, by partner pair, for reuse by parent-named links
    let mut by_partners: HashMap<(Option<PersonId>, Option<PersonId>), FamilyId> = HashMap::new();
    for record in data.families {
        let mut new = record.family;
        new.partner1 = new
            .partner1
            .map(|p| person_id(&persons, "partner1", p))
            .transpose()?;
        new.partner2 = new
            .partner2
            .map(|p| person_id(&persons, "partner2", p))
            .transpose()?;
        let created = tx.create_family(new)?;
        families.insert(record.id, created.id);
        by_partners.insert(partner_key(created.partner1, created.partner2), created.id);
        summary.families += 1;
    }

    let family_id = |field: &'static str, old: FamilyId| {
        families
            .get(&old)
            .copied()
            .ok_or(kinfolk_core::Error::DanglingReference {
                field,
                target: EntityRef::Family(old),
            })
    };

    for link in pending {
        if let Some(old) = link.parent_family {
            tx.attach_child(family_id("parent_family", old)?, link.person)?;
        } else if link.father.is_some() || link.mother.is_some() {
            let father = link
                .father
                .map(|p| person_id(&persons, "father_id", p))
                .transpose()?;
            let mother = link
                .mother
                .map(|p| person_id(&persons, "mother_id", p))
                .transpose()?;
            let family = match by_partners.get(&partner_key(father, mother)) {
                Some(family) => *family,
                None => {
                    let family = tx
                        .create_family(NewFamily {
                            partner1: father,
                            partner2: mother,
                            ..Default::default()
                        })?
                        .id;
                    by_partners.insert(partner_key(father, mother), family);
                    summary.families += 1;
                    family
                }
            };
            tx.attach_child(family, link.person)?;
        }
        if let Some(old) = link.adoptive_family {
            let family = family_id("adoptive_family", old)?;
            tx.update_person(link.person, PersonPatch::new().adoptive_family(Some(family)))?;
        }
    }

    for mut event in data.events {
        event.person = person_id(&persons, "person", event.person)?;
        tx.create_event(event)?;
        summary.events += 1;
    }

    for mut document in data.documents {
        document.person = document
            .person
            .map(|p| person_id(&persons, "person", p))
            .transpose()?;
        tx.create_document(document)?;
        summary.documents += 1;
    }

    Ok(summary)
}

/// Partner pairs match regardless of slot order
fn partner_key(a: Option<PersonId>, b: Option<PersonId>) -> (Option<PersonId>, Option<PersonId>) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

pub async fn run_import(args: &ImportArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    tracing::info!("Importing from {:?}", args.file);

    let content = std::fs::read_to_string(&args.file)?;
    let data: ImportData = serde_json::from_str(&content)?;
    if let Some(version) = &data.version {
        tracing::debug!("Import format version: {}", version);
    }

    if !args.merge {
        let existing = ctx.store.persons().await?.len();
        if existing > 0 {
            anyhow::bail!(
                "The tree already has {} persons. Use --merge to add to existing data.",
                existing
            );
        }
    }

    let summary = ctx
        .store
        .transact(move |tx| import_records(tx, data))
        .await?;
    ctx.after_mutation("import");

    tracing::info!(
        persons = summary.persons,
        families = summary.families,
        "Import committed"
    );
    if !cli.quiet {
        println!(
            "Imported {} persons, {} families, {} events and {} documents from {:?}",
            summary.persons, summary.families, summary.events, summary.documents, args.file
        );
    }
    Ok(())
}

pub async fn run_export(args: &ExportArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    tracing::info!("Exporting data");

    let tree = ctx.store.snapshot().await?;
    let content = match args.kind {
        ExportFormat::Json => {
            let data = ExportData::from_tree(&tree);
            tracing::debug!(
                "Exporting {} persons and {} families",
                data.persons.len(),
                data.families.len()
            );
            serde_json::to_string_pretty(&data)?
        }
        ExportFormat::Gedcom => gedcom::export(&tree)?,
    };

    if let Some(ref path) = args.output {
        // Write with secure permissions (0o600 = owner read/write only)
        #[cfg(unix)]
        {
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(path)?;
            file.write_all(content.as_bytes())?;
        }
        #[cfg(not(unix))]
        {
            std::fs::write(path, &content)?;
        }
        if !cli.quiet {
            println!("Exported to {:?}", path);
        }
    } else {
        print!("{}", content);
        if !content.ends_with('\n') {
            println!();
        }
    }

    Ok(())
}
