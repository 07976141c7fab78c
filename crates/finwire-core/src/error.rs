use thiserror::Error;

/// Validation and contract errors exposed by `finwire-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("currency must be a 3-letter ISO code: '{value}'")]
    InvalidCurrency { value: String },
    #[error("date must be YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },

    #[error(
        "invalid concept '{value}', expected one of exchange_rates, securities, llm, payments, merchant_enrichment"
    )]
    InvalidConcept { value: String },
    #[error("unknown provider '{value}'")]
    UnknownProvider { value: String },
    #[error("invalid region '{value}', expected us or eu")]
    InvalidRegion { value: String },
    #[error("invalid plaid environment '{value}', expected sandbox, development, or production")]
    InvalidPlaidEnvironment { value: String },

    #[error("invalid {field} source tag '{value}'")]
    InvalidSourceTag { field: &'static str, value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be positive")]
    NonPositiveValue { field: &'static str },

    #[error("envelope must carry data when successful and an error otherwise")]
    InconsistentEnvelope,
}

/// Top-level error type for core operations outside the provider boundary.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Provider(#[from] crate::ProviderError),

    #[error(transparent)]
    Warehouse(#[from] finwire_warehouse::WarehouseError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
