//! Calendar dates for life events

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Wire format for all calendar dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        Error::Validation(format!("Invalid date '{}': expected YYYY-MM-DD", value))
    })
}

/// A birth or death date, optionally flagged as an estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifeDate {
    pub date: NaiveDate,

    /// The date is an estimate ("about 1870")
    #[serde(default)]
    pub approximate: bool,
}

impl LifeDate {
    pub fn exact(date: NaiveDate) -> Self {
        Self {
            date,
            approximate: false,
        }
    }

    pub fn approximate(date: NaiveDate) -> Self {
        Self {
            date,
            approximate: true,
        }
    }

    pub fn parse(value: &str, approximate: bool) -> Result<Self> {
        Ok(Self {
            date: parse_date(value)?,
            approximate,
        })
    }
}

impl std::fmt::Display for LifeDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.approximate {
            write!(f, "~{}", self.date.format(DATE_FORMAT))
        } else {
            write!(f, "{}", self.date.format(DATE_FORMAT))
        }
    }
}

/// What is known about a person's death.
///
/// `NotRecorded` means the person is presumed alive; `DateUnknown` means the
/// person is known to be deceased but the date is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Death {
    #[default]
    NotRecorded,
    Dated(LifeDate),
    DateUnknown,
}

impl Death {
    pub fn is_deceased(&self) -> bool {
        !matches!(self, Self::NotRecorded)
    }

    pub fn date(&self) -> Option<LifeDate> {
        match self {
            Self::Dated(date) => Some(*date),
            _ => None,
        }
    }
}

/// Whole years elapsed between two dates
pub fn whole_years_between(from: NaiveDate, to: NaiveDate) -> i32 {
    let mut years = to.year() - from.year();
    if (to.month(), to.day()) < (from.month(), from.day()) {
        years -= 1;
    }
    years
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        let date = parse_date("1902-03-14").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(1902, 3, 14).unwrap());
        assert!(matches!(parse_date("14/03/1902"), Err(Error::Validation(_))));
        assert!(parse_date("1902-02-30").is_err());
    }

    #[test]
    fn test_whole_years() {
        let birth = NaiveDate::from_ymd_opt(1950, 6, 15).unwrap();
        assert_eq!(
            whole_years_between(birth, NaiveDate::from_ymd_opt(2000, 6, 14).unwrap()),
            49
        );
        assert_eq!(
            whole_years_between(birth, NaiveDate::from_ymd_opt(2000, 6, 15).unwrap()),
            50
        );
    }

    #[test]
    fn test_death_wire_format() {
        let death = Death::Dated(LifeDate::approximate(
            NaiveDate::from_ymd_opt(1944, 1, 1).unwrap(),
        ));
        let json = serde_json::to_value(death).unwrap();
        assert_eq!(json["status"], "dated");
        assert_eq!(json["date"], "1944-01-01");
        assert_eq!(json["approximate"], true);

        let unknown: Death = serde_json::from_str(r#"{"status":"date_unknown"}"#).unwrap();
        assert!(unknown.is_deceased());
        assert!(unknown.date().is_none());
        assert!(!Death::NotRecorded.is_deceased());
    }
}
