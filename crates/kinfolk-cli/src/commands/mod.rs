//! CLI command implementations

pub mod backup;
pub mod completions;
pub mod config;
pub mod document;
pub mod event;
pub mod family;
pub mod io;
pub mod person;
pub mod search;
pub mod trash;
pub mod tree;

use chrono::NaiveDate;
use kinfolk_core::{parse_date, LifeDate};

/// Parse a birth or death date; a leading `~` marks it as approximate
pub fn parse_life_date(value: &str) -> Result<LifeDate, String> {
    let value = value.trim();
    let result = match value.strip_prefix('~') {
        Some(rest) => LifeDate::parse(rest, true),
        None => LifeDate::parse(value, false),
    };
    result.map_err(|e| e.to_string())
}

pub fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    parse_date(value).map_err(|e| e.to_string())
}

/// Parse `key=value`; the value is read as JSON when it parses, else as a string
pub fn parse_key_value(value: &str) -> Result<(String, serde_json::Value), String> {
    let (key, raw) = value
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", value))?;
    let key = key.trim();
    if key.is_empty() {
        return Err("custom field key cannot be empty".to_string());
    }
    let parsed = serde_json::from_str(raw)
        .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
    Ok((key.to_string(), parsed))
}

/// Read an optional text flag where an empty string means "clear"
pub fn clearable(value: &Option<String>) -> Option<Option<String>> {
    value
        .as_ref()
        .map(|v| if v.is_empty() { None } else { Some(v.clone()) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_life_date() {
        let date = parse_life_date("~1870-01-01").unwrap();
        assert!(date.approximate);
        assert_eq!(date.to_string(), "~1870-01-01");
        assert!(!parse_life_date("1901-12-31").unwrap().approximate);
        assert!(parse_life_date("31/12/1901").is_err());
    }

    #[test]
    fn test_parse_key_value() {
        let (key, value) = parse_key_value("height=180").unwrap();
        assert_eq!(key, "height");
        assert_eq!(value, serde_json::json!(180));

        let (_, value) = parse_key_value("eyes=blue").unwrap();
        assert_eq!(value, serde_json::json!("blue"));

        let (_, value) = parse_key_value("motto=a=b").unwrap();
        assert_eq!(value, serde_json::json!("a=b"));

        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_clearable() {
        assert_eq!(clearable(&None), None);
        assert_eq!(clearable(&Some(String::new())), Some(None));
        assert_eq!(clearable(&Some("x".into())), Some(Some("x".to_string())));
    }
}
