use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::ValidationError;

/// Three-letter ISO 4217 currency code, stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input.trim().to_ascii_uppercase();
        if normalized.len() != 3 || !normalized.chars().all(|ch| ch.is_ascii_uppercase()) {
            return Err(ValidationError::InvalidCurrency {
                value: input.to_owned(),
            });
        }
        Ok(Self(normalized))
    }

    pub fn usd() -> Self {
        Self(String::from("USD"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CurrencyCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}

/// Parses a calendar date in `YYYY-MM-DD` form.
pub fn parse_date(input: &str) -> Result<Date, ValidationError> {
    let invalid = || ValidationError::InvalidDate {
        value: input.to_owned(),
    };

    let mut parts = input.trim().splitn(3, '-');
    let year = parts
        .next()
        .filter(|part| part.len() == 4)
        .and_then(|part| part.parse::<i32>().ok())
        .ok_or_else(invalid)?;
    let month = parts
        .next()
        .filter(|part| part.len() == 2)
        .and_then(|part| part.parse::<u8>().ok())
        .and_then(|month| Month::try_from(month).ok())
        .ok_or_else(invalid)?;
    let day = parts
        .next()
        .filter(|part| part.len() == 2)
        .and_then(|part| part.parse::<u8>().ok())
        .ok_or_else(invalid)?;

    Date::from_calendar_date(year, month, day).map_err(|_| invalid())
}

/// Formats a date as `YYYY-MM-DD` for vendor query strings.
pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}
