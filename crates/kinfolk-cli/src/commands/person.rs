//! Person commands

use clap::{Args, Subcommand};

use kinfolk_core::{
    Death, FamilyId, Gender, Genealogy, LifeDate, NewPerson, PersonId, PersonPatch,
};

use super::{clearable, parse_key_value, parse_life_date};
use crate::output::{person_line, print_json, print_people, OutputFormat};
use crate::{AppContext, Cli};

#[derive(Args)]
pub struct PersonArgs {
    #[command(subcommand)]
    pub command: PersonCommands,
}

#[derive(Subcommand)]
pub enum PersonCommands {
    /// Add a new person
    Add {
        /// First name
        first: String,
        /// Last name
        last: String,
        #[arg(long)]
        middle: Option<String>,
        /// Maiden name
        #[arg(long)]
        maiden: Option<String>,
        #[arg(long)]
        nickname: Option<String>,
        /// male, female or unknown
        #[arg(short, long)]
        gender: Option<Gender>,
        /// Birth date (YYYY-MM-DD, prefix with ~ when approximate)
        #[arg(short, long, value_parser = parse_life_date)]
        born: Option<LifeDate>,
        #[arg(long)]
        birth_place: Option<String>,
        /// Death date (YYYY-MM-DD, prefix with ~ when approximate)
        #[arg(long, value_parser = parse_life_date, conflicts_with = "deceased")]
        died: Option<LifeDate>,
        /// Deceased, date unknown
        #[arg(long)]
        deceased: bool,
        #[arg(long)]
        death_place: Option<String>,
        #[arg(long)]
        occupation: Option<String>,
        #[arg(long)]
        biography: Option<String>,
        #[arg(short, long)]
        notes: Option<String>,
        /// Custom field as key=value (repeatable)
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, serde_json::Value)>,
        /// Biological parent family
        #[arg(long)]
        family: Option<FamilyId>,
        #[arg(long)]
        adoptive_family: Option<FamilyId>,
        /// Position among siblings, starting at 1
        #[arg(long)]
        birth_order: Option<u32>,
        #[arg(long)]
        twin: bool,
    },
    /// Get person details
    Get {
        id: PersonId,
    },
    /// List persons
    List {
        /// Limit results
        #[arg(short, long, default_value = "100")]
        limit: usize,
        #[arg(long, default_value = "0")]
        offset: usize,
    },
    /// Update an existing person; an empty text value clears the field
    Update {
        id: PersonId,
        #[arg(long)]
        first: Option<String>,
        #[arg(long)]
        last: Option<String>,
        #[arg(long)]
        middle: Option<String>,
        #[arg(long)]
        maiden: Option<String>,
        #[arg(long)]
        nickname: Option<String>,
        #[arg(short, long)]
        gender: Option<Gender>,
        #[arg(short, long, value_parser = parse_life_date, conflicts_with = "clear_birth")]
        born: Option<LifeDate>,
        /// Forget the birth date
        #[arg(long)]
        clear_birth: bool,
        #[arg(long)]
        birth_place: Option<String>,
        #[arg(long, value_parser = parse_life_date, conflicts_with_all = ["deceased", "alive"])]
        died: Option<LifeDate>,
        /// Deceased, date unknown
        #[arg(long, conflicts_with = "alive")]
        deceased: bool,
        /// Remove any recorded death
        #[arg(long)]
        alive: bool,
        #[arg(long)]
        death_place: Option<String>,
        #[arg(long)]
        occupation: Option<String>,
        #[arg(long)]
        biography: Option<String>,
        #[arg(short, long)]
        notes: Option<String>,
        /// Set a custom field as key=value (repeatable)
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, serde_json::Value)>,
        /// Remove a custom field (repeatable)
        #[arg(long = "unset-field")]
        unset_fields: Vec<String>,
        /// Move to another biological parent family
        #[arg(long, conflicts_with = "no_family")]
        family: Option<FamilyId>,
        /// Detach from the biological parent family
        #[arg(long)]
        no_family: bool,
        #[arg(long, conflicts_with = "no_adoptive_family")]
        adoptive_family: Option<FamilyId>,
        #[arg(long)]
        no_adoptive_family: bool,
        #[arg(long)]
        birth_order: Option<u32>,
        #[arg(long)]
        twin: Option<bool>,
    },
    /// Move a person to the trash
    Delete {
        id: PersonId,
    },
    /// Show every relation of a person
    Relatives {
        id: PersonId,
    },
}

pub async fn run(args: &PersonArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let format = cli.output();

    match &args.command {
        PersonCommands::Add {
            first,
            last,
            middle,
            maiden,
            nickname,
            gender,
            born,
            birth_place,
            died,
            deceased,
            death_place,
            occupation,
            biography,
            notes,
            fields,
            family,
            adoptive_family,
            birth_order,
            twin,
        } => {
            let mut new = NewPerson::new(first, last);
            new.name.middle = middle.clone();
            new.name.maiden = maiden.clone();
            new.name.nickname = nickname.clone();
            new.gender = gender.unwrap_or_default();
            new.birth = *born;
            new.birth_place = birth_place.clone();
            new.death = match (died, deceased) {
                (Some(date), _) => Death::Dated(*date),
                (None, true) => Death::DateUnknown,
                (None, false) => Death::NotRecorded,
            };
            new.death_place = death_place.clone();
            new.occupation = occupation.clone();
            new.biography = biography.clone();
            new.notes = notes.clone();
            new.custom_fields = fields.iter().cloned().collect();
            new.parent_family = *family;
            new.adoptive_family = *adoptive_family;
            new.birth_order = *birth_order;
            new.is_twin = *twin;

            let person = ctx.store.create_person(new).await?;
            ctx.after_mutation("person add");

            match format {
                OutputFormat::Json => print_json(&person)?,
                OutputFormat::Table => println!("Created person {}", person_line(&person)),
            }
        }
        PersonCommands::Get { id } => {
            let person = ctx.store.person(*id).await?;
            let events = ctx.store.events_for(*id).await?;
            let documents = ctx.store.documents_for(*id).await?;

            if format == OutputFormat::Json {
                return print_json(&serde_json::json!({
                    "person": person,
                    "events": events,
                    "documents": documents,
                }));
            }

            println!("Person: {}", person_line(&person));
            if let Some(nickname) = &person.name.nickname {
                println!("  Nickname: {}", nickname);
            }
            println!("  Gender: {}", person.gender);
            if let Some(place) = &person.birth_place {
                println!("  Birth place: {}", place);
            }
            if let Some(place) = &person.death_place {
                println!("  Death place: {}", place);
            }
            if let Some(age) = person.age_on(chrono::Utc::now().date_naive()) {
                println!("  Age: {}", age);
            }
            if let Some(occupation) = &person.occupation {
                println!("  Occupation: {}", occupation);
            }
            if let Some(family) = person.parent_family {
                println!("  Parent family: #{}", family);
            }
            if let Some(family) = person.adoptive_family {
                println!("  Adoptive family: #{}", family);
            }
            if let Some(order) = person.birth_order {
                println!("  Birth order: {}{}", order, if person.is_twin { " (twin)" } else { "" });
            }
            if let Some(biography) = &person.biography {
                println!("  Biography: {}", biography);
            }
            if let Some(notes) = &person.notes {
                println!("  Notes: {}", notes);
            }
            for (key, value) in &person.custom_fields {
                println!("  {}: {}", key, value);
            }
            println!("  Created: {}", person.created_at);
            println!("  Updated: {}", person.updated_at);

            if !events.is_empty() {
                println!("  Events:");
                for event in &events {
                    let date = event
                        .date
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "undated".to_string());
                    let place = event
                        .place
                        .as_ref()
                        .map(|p| format!(" at {}", p))
                        .unwrap_or_default();
                    println!("    #{} {} ({}){}", event.id, event.kind, date, place);
                }
            }
            if !documents.is_empty() {
                println!("  Documents:");
                for document in &documents {
                    println!("    #{} {} [{}]", document.id, document.title, document.kind);
                }
            }
        }
        PersonCommands::List { limit, offset } => {
            let persons: Vec<_> = ctx
                .store
                .persons()
                .await?
                .into_iter()
                .skip(*offset)
                .take(*limit)
                .collect();
            tracing::info!("Found {} persons", persons.len());

            match format {
                OutputFormat::Json => print_json(&persons)?,
                OutputFormat::Table if persons.is_empty() => println!("No persons found"),
                OutputFormat::Table => print_people("Persons", &persons),
            }
        }
        PersonCommands::Update {
            id,
            first,
            last,
            middle,
            maiden,
            nickname,
            gender,
            born,
            clear_birth,
            birth_place,
            died,
            deceased,
            alive,
            death_place,
            occupation,
            biography,
            notes,
            fields,
            unset_fields,
            family,
            no_family,
            adoptive_family,
            no_adoptive_family,
            birth_order,
            twin,
        } => {
            let mut patch = PersonPatch::new();
            patch.first = first.clone();
            patch.last = last.clone();
            patch.middle = clearable(middle);
            patch.maiden = clearable(maiden);
            patch.nickname = clearable(nickname);
            patch.gender = *gender;
            if *clear_birth {
                patch.birth = Some(None);
            } else if let Some(date) = born {
                patch.birth = Some(Some(*date));
            }
            patch.birth_place = clearable(birth_place);
            patch.death = match (died, deceased, alive) {
                (Some(date), _, _) => Some(Death::Dated(*date)),
                (None, true, _) => Some(Death::DateUnknown),
                (None, false, true) => Some(Death::NotRecorded),
                _ => None,
            };
            patch.death_place = clearable(death_place);
            patch.occupation = clearable(occupation);
            patch.biography = clearable(biography);
            patch.notes = clearable(notes);
            for (key, value) in fields {
                patch.custom_fields.insert(key.clone(), Some(value.clone()));
            }
            for key in unset_fields {
                patch.custom_fields.insert(key.clone(), None);
            }
            if *no_family {
                patch.parent_family = Some(None);
            } else if let Some(family) = family {
                patch.parent_family = Some(Some(*family));
            }
            if *no_adoptive_family {
                patch.adoptive_family = Some(None);
            } else if let Some(family) = adoptive_family {
                patch.adoptive_family = Some(Some(*family));
            }
            patch.birth_order = (*birth_order).map(Some);
            patch.is_twin = *twin;

            if patch.is_empty() {
                anyhow::bail!("Nothing to update");
            }

            let person = ctx.store.update_person(*id, patch).await?;
            ctx.after_mutation("person update");

            match format {
                OutputFormat::Json => print_json(&person)?,
                OutputFormat::Table => println!("Updated person {}", person_line(&person)),
            }
        }
        PersonCommands::Delete { id } => {
            ctx.store.delete_person(*id).await?;
            ctx.after_mutation("person delete");
            if !cli.quiet {
                println!("Moved person #{} to the trash", id);
            }
        }
        PersonCommands::Relatives { id } => {
            let report = ctx.store.relatives(*id).await?;
            match format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Table => {
                    println!("Relatives of {}", person_line(&report.person));
                    print_people("Parents", &report.parents);
                    print_people("Adoptive parents", &report.adoptive_parents);
                    print_people("Partners", &report.partners);
                    print_people("Siblings", &report.siblings);
                    print_people("Half-siblings", &report.half_siblings);
                    print_people("Children", &report.children);
                }
            }
        }
    }

    Ok(())
}
