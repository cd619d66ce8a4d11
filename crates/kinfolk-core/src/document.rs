//! Documents and media referenced from the tree
//!
//! Only the metadata is stored here; the file itself lives wherever
//! `file_path` points.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::ids::{DocumentId, PersonId};
use crate::limits::{validate_file_path, validate_title, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Photo,
    Certificate,
    Letter,
    Record,
    #[default]
    Other,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Certificate => "certificate",
            Self::Letter => "letter",
            Self::Record => "record",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "photo" => Ok(Self::Photo),
            "certificate" => Ok(Self::Certificate),
            "letter" => Ok(Self::Letter),
            "record" => Ok(Self::Record),
            "other" => Ok(Self::Other),
            other => Err(Error::Validation(format!("Unknown document kind '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    /// Person the document is about; detached documents have none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person: Option<PersonId>,
    #[serde(default)]
    pub kind: DocumentKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub file_path: String,
    /// Media type hint such as "image" or "pdf"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Document {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title("document title", Some(&self.title))?;
        validate_file_path(&self.file_path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    #[serde(default)]
    pub person: Option<PersonId>,
    #[serde(default)]
    pub kind: DocumentKind,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub file_path: String,
    #[serde(default)]
    pub file_type: Option<String>,
}

impl NewDocument {
    pub fn new(title: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            person: None,
            kind: DocumentKind::Other,
            title: title.into(),
            description: None,
            file_path: file_path.into(),
            file_type: None,
        }
    }

    pub fn about(mut self, person: PersonId) -> Self {
        self.person = Some(person);
        self
    }

    pub fn with_kind(mut self, kind: DocumentKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_file_type(mut self, file_type: impl Into<String>) -> Self {
        self.file_type = Some(file_type.into());
        self
    }

    pub fn into_document(self, id: DocumentId, now: DateTime<Utc>) -> Document {
        Document {
            id,
            person: self.person,
            kind: self.kind,
            title: self.title,
            description: self.description,
            file_path: self.file_path,
            file_type: self.file_type,
            uploaded_at: now,
            deleted_at: None,
        }
    }
}
