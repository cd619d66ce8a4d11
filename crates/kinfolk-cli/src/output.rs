//! Output formatting utilities

use serde::Serialize;

use kinfolk_core::{Family, FamilyTree, Person};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Table,
        }
    }
}

pub fn print_json<T: Serialize>(data: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

/// `#3 Carol Ann Smith (b. 1950-02-01, d. ~2010-05-06)`
pub fn person_line(person: &Person) -> String {
    let mut line = format!("#{} {}", person.id, person.display_name());
    let mut life = Vec::new();
    if let Some(birth) = person.birth {
        life.push(format!("b. {}", birth));
    }
    if let Some(death) = person.death.date() {
        life.push(format!("d. {}", death));
    } else if person.death.is_deceased() {
        life.push("deceased".to_string());
    }
    if !life.is_empty() {
        line.push_str(&format!(" ({})", life.join(", ")));
    }
    line
}

/// `#2 Alice Smith + Bob Smith [marriage, active]`
pub fn family_line(family: &Family, tree: &FamilyTree) -> String {
    let partner = |id: Option<kinfolk_core::PersonId>| match id {
        Some(id) => match tree.persons.get(&id) {
            Some(person) if person.is_deleted() => format!("{} (trashed)", person.full_name()),
            Some(person) => person.full_name(),
            None => format!("#{}", id),
        },
        None => "?".to_string(),
    };
    format!(
        "#{} {} + {} [{}, {}]",
        family.id,
        partner(family.partner1),
        partner(family.partner2),
        family.relationship,
        family.status
    )
}

pub fn print_people(heading: &str, people: &[Person]) {
    if people.is_empty() {
        println!("{}: none", heading);
        return;
    }
    println!("{} ({}):", heading, people.len());
    for person in people {
        println!("  {}", person_line(person));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kinfolk_core::{Death, LifeDate, NewFamily, NewPerson, PersonId};

    #[test]
    fn test_person_line() {
        let person = NewPerson::new("Carol", "Smith")
            .born(LifeDate::parse("1950-02-01", false).unwrap())
            .died(Death::Dated(LifeDate::parse("2010-05-06", true).unwrap()))
            .into_person(PersonId(3), Utc::now());
        assert_eq!(
            person_line(&person),
            "#3 Carol Smith (b. 1950-02-01, d. ~2010-05-06)"
        );

        let person = NewPerson::new("Old", "Timer")
            .died(Death::DateUnknown)
            .into_person(PersonId(4), Utc::now());
        assert_eq!(person_line(&person), "#4 Old Timer (deceased)");
    }

    #[test]
    fn test_family_line() {
        let now = Utc::now();
        let mut tree = FamilyTree::new();
        let alice = NewPerson::new("Alice", "Smith").into_person(PersonId(1), now);
        tree.persons.insert(alice.id, alice);
        let family = NewFamily::single_parent(PersonId(1)).into_family(kinfolk_core::FamilyId(2), now);
        assert_eq!(
            family_line(&family, &tree),
            format!("#2 Alice Smith + ? [{}, {}]", family.relationship, family.status)
        );
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from("table"), OutputFormat::Table);
        assert_eq!(OutputFormat::from("csv"), OutputFormat::Table);
    }
}
