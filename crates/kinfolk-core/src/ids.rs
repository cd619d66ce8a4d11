//! Record identifiers
//!
//! Ids are positive integers handed out by the store, one sequence per
//! record kind. Ascending id order is insertion order.

use serde::{Deserialize, Serialize};

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Unique identifier for a person
    PersonId
);

record_id!(
    /// Unique identifier for a family (union) node
    FamilyId
);

record_id!(
    /// Unique identifier for a life event
    EventId
);

record_id!(
    /// Unique identifier for a document
    DocumentId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let id: PersonId = " 42 ".parse().unwrap();
        assert_eq!(id, PersonId(42));
        assert_eq!(id.to_string(), "42");
        assert!("abc".parse::<FamilyId>().is_err());
    }

    #[test]
    fn test_serializes_as_plain_integer() {
        let json = serde_json::to_string(&FamilyId(7)).unwrap();
        assert_eq!(json, "7");
    }
}
