//! Input validation limits for record fields and traversals

/// Maximum length for a single name part (100 chars)
pub const MAX_NAME_LEN: usize = 100;

/// Maximum length for a place name (200 chars)
pub const MAX_PLACE_LEN: usize = 200;

/// Maximum custom fields per person (100)
pub const MAX_CUSTOM_FIELDS: usize = 100;

/// Maximum custom field key length (64 chars)
pub const MAX_CUSTOM_FIELD_KEY_LEN: usize = 64;

/// Default depth for ancestor and descendant walks (10)
pub const DEFAULT_TRAVERSAL_DEPTH: u32 = 10;

/// Maximum traversal depth (50)
pub const MAX_TRAVERSAL_DEPTH: u32 = 50;

/// Maximum nodes in a single traversal result (10000)
pub const MAX_TRAVERSAL_NODES: usize = 10000;

/// Validation error type
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyField { field: &'static str },
    FieldTooLong { field: &'static str, len: usize, max: usize },
    TooManyCustomFields { count: usize, max: usize },
    EmptyCustomFieldKey,
    CustomFieldKeyTooLong { len: usize, max: usize },
    TraversalDepthTooLarge { depth: u32, max: u32 },
    InvalidBirthOrder,
    EndBeforeStart { start_field: &'static str, end_field: &'static str },
    EmptyFilePath,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField { field } => write!(f, "{} cannot be empty", field),
            Self::FieldTooLong { field, len, max } => {
                write!(f, "{} too long: {} chars (max {})", field, len, max)
            }
            Self::TooManyCustomFields { count, max } => {
                write!(f, "Too many custom fields: {} (max {})", count, max)
            }
            Self::EmptyCustomFieldKey => write!(f, "Custom field key cannot be empty"),
            Self::CustomFieldKeyTooLong { len, max } => {
                write!(f, "Custom field key too long: {} chars (max {})", len, max)
            }
            Self::TraversalDepthTooLarge { depth, max } => {
                write!(f, "Traversal depth too large: {} (max {})", depth, max)
            }
            Self::InvalidBirthOrder => write!(f, "Birth order must be 1 or greater"),
            Self::EndBeforeStart {
                start_field,
                end_field,
            } => write!(f, "{} is before {}", end_field, start_field),
            Self::EmptyFilePath => write!(f, "Document file path cannot be empty"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a required name part (first or last name)
pub fn validate_required_name(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    validate_len(field, value, MAX_NAME_LEN)
}

/// Validate an optional name part
pub fn validate_optional_name(
    field: &'static str,
    value: Option<&str>,
) -> Result<(), ValidationError> {
    match value {
        Some(value) => validate_len(field, value, MAX_NAME_LEN),
        None => Ok(()),
    }
}

/// Validate an optional place name
pub fn validate_place(field: &'static str, value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(value) => validate_len(field, value, MAX_PLACE_LEN),
        None => Ok(()),
    }
}

fn validate_len(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len > max {
        return Err(ValidationError::FieldTooLong { field, len, max });
    }
    Ok(())
}

/// Validate an optional free-text title or short label
pub fn validate_title(field: &'static str, value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(value) => validate_len(field, value, MAX_PLACE_LEN),
        None => Ok(()),
    }
}

/// Validate custom field keys and count
pub fn validate_custom_fields<'a>(
    keys: impl ExactSizeIterator<Item = &'a String>,
) -> Result<(), ValidationError> {
    let count = keys.len();
    if count > MAX_CUSTOM_FIELDS {
        return Err(ValidationError::TooManyCustomFields {
            count,
            max: MAX_CUSTOM_FIELDS,
        });
    }
    for key in keys {
        if key.trim().is_empty() {
            return Err(ValidationError::EmptyCustomFieldKey);
        }
        if key.len() > MAX_CUSTOM_FIELD_KEY_LEN {
            return Err(ValidationError::CustomFieldKeyTooLong {
                len: key.len(),
                max: MAX_CUSTOM_FIELD_KEY_LEN,
            });
        }
    }
    Ok(())
}

/// Validate traversal depth
pub fn validate_traversal_depth(depth: u32) -> Result<(), ValidationError> {
    if depth > MAX_TRAVERSAL_DEPTH {
        return Err(ValidationError::TraversalDepthTooLarge {
            depth,
            max: MAX_TRAVERSAL_DEPTH,
        });
    }
    Ok(())
}

/// Validate birth order among siblings
pub fn validate_birth_order(order: Option<u32>) -> Result<(), ValidationError> {
    match order {
        Some(0) => Err(ValidationError::InvalidBirthOrder),
        _ => Ok(()),
    }
}

/// Validate a document file path
pub fn validate_file_path(path: &str) -> Result<(), ValidationError> {
    if path.trim().is_empty() {
        return Err(ValidationError::EmptyFilePath);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_required_name() {
        assert!(validate_required_name("first name", "Ada").is_ok());
        assert_eq!(
            validate_required_name("first name", "  "),
            Err(ValidationError::EmptyField {
                field: "first name"
            })
        );
        assert!(validate_required_name("last name", &"x".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_place_counts_chars() {
        // 200 two-byte chars is within the limit
        assert!(validate_place("birth place", Some(&"é".repeat(200))).is_ok());
        assert!(validate_place("birth place", Some(&"a".repeat(201))).is_err());
        assert!(validate_place("birth place", None).is_ok());
    }

    #[test]
    fn test_validate_custom_fields() {
        let keys = vec!["religion".to_string(), "".to_string()];
        assert_eq!(
            validate_custom_fields(keys.iter()),
            Err(ValidationError::EmptyCustomFieldKey)
        );
        let many: Vec<String> = (0..101).map(|i| format!("k{}", i)).collect();
        assert!(validate_custom_fields(many.iter()).is_err());
    }

    #[test]
    fn test_validate_traversal_depth_and_birth_order() {
        assert!(validate_traversal_depth(50).is_ok());
        assert!(validate_traversal_depth(51).is_err());
        assert!(validate_birth_order(Some(0)).is_err());
        assert!(validate_birth_order(Some(1)).is_ok());
        assert!(validate_birth_order(None).is_ok());
    }
}
