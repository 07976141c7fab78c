use serde::{Deserialize, Serialize};
use time::Date;

use crate::{CurrencyCode, Symbol, ValidationError};

/// Conversion rate from one currency to another on a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub date: Date,
    pub rate: f64,
}

impl ExchangeRate {
    pub fn new(
        from: CurrencyCode,
        to: CurrencyCode,
        date: Date,
        rate: f64,
    ) -> Result<Self, ValidationError> {
        validate_positive("rate", rate)?;
        Ok(Self {
            from,
            to,
            date,
            rate,
        })
    }
}

/// Closing price of a security on a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityPrice {
    pub symbol: Symbol,
    pub date: Date,
    pub price: f64,
    pub currency: CurrencyCode,
}

impl SecurityPrice {
    pub fn new(
        symbol: Symbol,
        date: Date,
        price: f64,
        currency: CurrencyCode,
    ) -> Result<Self, ValidationError> {
        validate_positive("price", price)?;
        Ok(Self {
            symbol,
            date,
            price,
            currency,
        })
    }
}

/// Security metadata returned by search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Security {
    pub symbol: Symbol,
    pub name: String,
    pub exchange: Option<String>,
    pub currency: Option<CurrencyCode>,
}

fn validate_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value <= 0.0 {
        return Err(ValidationError::NonPositiveValue { field });
    }
    Ok(())
}
