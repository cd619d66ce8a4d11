//! Error types for Kinfolk Core

use thiserror::Error;

use crate::ids::PersonId;
use crate::limits::ValidationError;
use crate::tree::EntityRef;

/// Result type alias using Kinfolk's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Kinfolk error types
#[derive(Error, Debug)]
pub enum Error {
    /// The record does not exist or is in the trash
    #[error("Not found: {0}")]
    NotFound(EntityRef),

    #[error("A family cannot have person {0} in both partner slots")]
    SelfUnion(PersonId),

    #[error("Dangling reference: {field} points to missing or deleted {target}")]
    DanglingReference {
        field: &'static str,
        target: EntityRef,
    },

    #[error("Parentage cycle detected: {}", format_cycle(.0))]
    CycleDetected(Vec<PersonId>),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable machine-readable code for each error kind
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::SelfUnion(_) => "self_union",
            Self::DanglingReference { .. } => "dangling_reference",
            Self::CycleDetected(_) => "cycle_detected",
            Self::Validation(_) => "validation_failure",
            Self::Storage(_) => "storage",
            Self::Serialization(_) => "serialization",
            Self::Internal(_) => "internal",
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

fn format_cycle(path: &[PersonId]) -> String {
    path.iter()
        .map(|id| format!("person {}", id))
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::FamilyId;

    #[test]
    fn test_error_codes_are_distinct() {
        let errors = [
            Error::NotFound(EntityRef::Person(PersonId(1))),
            Error::SelfUnion(PersonId(1)),
            Error::DanglingReference {
                field: "parent_family",
                target: EntityRef::Family(FamilyId(9)),
            },
            Error::CycleDetected(vec![PersonId(1), PersonId(2)]),
            Error::validation("bad date"),
        ];
        let codes: std::collections::HashSet<_> = errors.iter().map(Error::code).collect();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_cycle_message() {
        let err = Error::CycleDetected(vec![PersonId(3), PersonId(1), PersonId(3)]);
        assert_eq!(
            err.to_string(),
            "Parentage cycle detected: person 3 -> person 1 -> person 3"
        );
    }
}
