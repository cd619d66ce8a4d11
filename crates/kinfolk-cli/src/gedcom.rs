//! GEDCOM 5.5.1 export
//!
//! Persons become `INDI` records and families `FAM` records. The first
//! partner slot is written as `HUSB` and the second as `WIFE`.

use chrono::NaiveDate;

use kinfolk_core::{
    Death, EventKind, FamilyTree, Gender, KinshipGraph, LifeDate, Person, RelationshipType,
    UnionStatus,
};

/// Render the live records of `tree`
pub fn export(tree: &FamilyTree) -> kinfolk_core::Result<String> {
    let graph = KinshipGraph::new(tree);
    let mut out = Gedcom::default();

    out.line(0, "HEAD", None);
    out.line(1, "SOUR", Some("KINFOLK"));
    out.line(2, "VERS", Some(env!("CARGO_PKG_VERSION")));
    out.line(1, "GEDC", None);
    out.line(2, "VERS", Some("5.5.1"));
    out.line(2, "FORM", Some("LINEAGE-LINKED"));
    out.line(1, "CHAR", Some("UTF-8"));

    for person in tree.live_persons() {
        write_person(&mut out, &graph, tree, person)?;
    }

    for family in tree.live_families() {
        out.record(&format!("@F{}@", family.id), "FAM");
        if let Some(id) = family.partner1.filter(|id| tree.live_person(*id).is_some()) {
            out.line(1, "HUSB", Some(&format!("@I{}@", id)));
        }
        if let Some(id) = family.partner2.filter(|id| tree.live_person(*id).is_some()) {
            out.line(1, "WIFE", Some(&format!("@I{}@", id)));
        }
        if matches!(
            family.relationship,
            RelationshipType::Marriage | RelationshipType::CivilPartnership
        ) || family.start_date.is_some()
        {
            let tag = match family.relationship {
                RelationshipType::Marriage | RelationshipType::CivilPartnership => "MARR",
                RelationshipType::Engagement => "ENGA",
                _ => "EVEN",
            };
            out.line(1, tag, None);
            if tag == "EVEN" {
                out.line(2, "TYPE", Some(family.relationship.as_str()));
            }
            if let Some(date) = family.start_date {
                out.line(2, "DATE", Some(&gedcom_date(date)));
            }
            if let Some(place) = &family.place {
                out.line(2, "PLAC", Some(place));
            }
        }
        if matches!(family.status, UnionStatus::Divorced | UnionStatus::Annulled) {
            let tag = match family.status {
                UnionStatus::Annulled => "ANUL",
                _ => "DIV",
            };
            out.line(1, tag, None);
            if let Some(date) = family.end_date {
                out.line(2, "DATE", Some(&gedcom_date(date)));
            }
        }
        let mut children = graph.children_of_family(family.id)?;
        children.extend(graph.adoptees_of(family.id)?);
        for child in children {
            out.line(1, "CHIL", Some(&format!("@I{}@", child.id)));
        }
        if let Some(notes) = &family.notes {
            out.text(1, "NOTE", notes);
        }
    }

    out.line(0, "TRLR", None);
    Ok(out.finish())
}

fn write_person(
    out: &mut Gedcom,
    graph: &KinshipGraph<'_>,
    tree: &FamilyTree,
    person: &Person,
) -> kinfolk_core::Result<()> {
    let name = &person.name;
    out.record(&format!("@I{}@", person.id), "INDI");

    let given = match &name.middle {
        Some(middle) if !middle.is_empty() => format!("{} {}", name.first, middle),
        _ => name.first.clone(),
    };
    out.line(1, "NAME", Some(&format!("{} /{}/", given, name.last)));
    out.line(2, "GIVN", Some(&given));
    out.line(2, "SURN", Some(&name.last));
    if let Some(nickname) = name.nickname.as_deref().filter(|n| !n.is_empty()) {
        out.line(2, "NICK", Some(nickname));
    }
    if let Some(maiden) = name.maiden.as_deref().filter(|m| !m.is_empty()) {
        out.line(1, "NAME", Some(&format!("{} /{}/", given, maiden)));
        out.line(2, "TYPE", Some("maiden"));
    }

    match person.gender {
        Gender::Male => out.line(1, "SEX", Some("M")),
        Gender::Female => out.line(1, "SEX", Some("F")),
        Gender::Unknown => out.line(1, "SEX", Some("U")),
    }

    if person.birth.is_some() || person.birth_place.is_some() {
        out.line(1, "BIRT", None);
        if let Some(birth) = person.birth {
            out.line(2, "DATE", Some(&life_date(birth)));
        }
        if let Some(place) = &person.birth_place {
            out.line(2, "PLAC", Some(place));
        }
    }

    match person.death {
        Death::NotRecorded => {}
        Death::Dated(date) => {
            out.line(1, "DEAT", None);
            out.line(2, "DATE", Some(&life_date(date)));
        }
        Death::DateUnknown => out.line(1, "DEAT", Some("Y")),
    }
    if person.death.is_deceased() {
        if let Some(place) = &person.death_place {
            out.line(2, "PLAC", Some(place));
        }
    }

    if let Some(occupation) = &person.occupation {
        out.line(1, "OCCU", Some(occupation));
    }

    for event in tree.events_for(person.id) {
        let (tag, kind) = event_tag(event.kind);
        match kind {
            Some(kind) => {
                out.line(1, tag, None);
                out.line(2, "TYPE", Some(kind));
            }
            None => out.line(1, tag, None),
        }
        if let Some(date) = event.date {
            out.line(2, "DATE", Some(&gedcom_date(date)));
        }
        if let Some(place) = &event.place {
            out.line(2, "PLAC", Some(place));
        }
        if let Some(description) = &event.description {
            out.text(2, "NOTE", description);
        }
    }

    if let Some(family) = person.parent_family {
        if tree.live_family(family).is_some() {
            out.line(1, "FAMC", Some(&format!("@F{}@", family)));
        }
    }
    if let Some(family) = person.adoptive_family {
        if tree.live_family(family).is_some() {
            out.line(1, "FAMC", Some(&format!("@F{}@", family)));
            out.line(2, "PEDI", Some("adopted"));
        }
    }
    for family in graph.families_of(person.id)? {
        out.line(1, "FAMS", Some(&format!("@F{}@", family.id)));
    }

    if let Some(biography) = &person.biography {
        out.text(1, "NOTE", biography);
    }
    if let Some(notes) = &person.notes {
        out.text(1, "NOTE", notes);
    }
    Ok(())
}

/// GEDCOM tag for an event kind, plus a `TYPE` for generic events
fn event_tag(kind: EventKind) -> (&'static str, Option<&'static str>) {
    match kind {
        EventKind::Baptism => ("BAPM", None),
        EventKind::Confirmation => ("CONF", None),
        EventKind::Graduation => ("GRAD", None),
        EventKind::Military => ("EVEN", Some("Military")),
        EventKind::Immigration => ("IMMI", None),
        EventKind::Emigration => ("EMIG", None),
        EventKind::Residence => ("RESI", None),
        EventKind::Occupation => ("EVEN", Some("Occupation")),
        EventKind::Burial => ("BURI", None),
        EventKind::Other => ("EVEN", None),
    }
}

/// `01 JAN 1900`
fn gedcom_date(date: NaiveDate) -> String {
    date.format("%d %b %Y").to_string().to_uppercase()
}

/// Approximate dates carry the `ABT` qualifier
fn life_date(date: LifeDate) -> String {
    if date.approximate {
        format!("ABT {}", gedcom_date(date.date))
    } else {
        gedcom_date(date.date)
    }
}

#[derive(Default)]
struct Gedcom {
    lines: Vec<String>,
}

impl Gedcom {
    fn line(&mut self, level: u8, tag: &str, value: Option<&str>) {
        match value {
            Some(value) => self.lines.push(format!("{} {} {}", level, tag, value)),
            None => self.lines.push(format!("{} {}", level, tag)),
        }
    }

    fn record(&mut self, xref: &str, tag: &str) {
        self.lines.push(format!("0 {} {}", xref, tag));
    }

    /// Multi-line text continues on `CONT` lines
    fn text(&mut self, level: u8, tag: &str, text: &str) {
        let mut lines = text.lines();
        self.line(level, tag, lines.next());
        for rest in lines {
            if rest.is_empty() {
                self.line(level + 1, "CONT", None);
            } else {
                self.line(level + 1, "CONT", Some(rest));
            }
        }
    }

    fn finish(self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}
