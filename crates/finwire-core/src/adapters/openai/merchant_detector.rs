use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{AutoDetectedMerchant, ProviderError, TransactionInput, UserMerchant};

pub(super) const SCHEMA_NAME: &str = "detect_merchants_from_transactions";

pub(super) const INSTRUCTIONS: &str = "\
You are an assistant to a consumer personal finance app. You will be provided a list \
of the user's transactions and a list of the user's merchants. Your job is to detect \
the business behind each transaction.

Closely follow ALL the rules below:

- Return one result per transaction
- Correlate each transaction by ID (transaction_id)
- Do not include the subdomain in the business_url (i.e. \"amazon.com\" not \"www.amazon.com\")
- User merchants are considered \"manual\" user-generated merchants and should only be used \
in 100% clear cases
- Be slightly pessimistic. We favor returning \"null\" over returning a false positive.
- NEVER return a name or URL for generic transaction names (e.g. \"Paycheck\", \"Laundromat\", \
\"Grocery store\", \"Local diner\")
- If you don't know the business name or URL, return \"null\" for both
";

#[derive(Serialize)]
struct Prompt<'a> {
    user_merchants: &'a [UserMerchant],
    transactions: &'a [TransactionInput],
}

pub(super) fn prompt(
    transactions: &[TransactionInput],
    user_merchants: &[UserMerchant],
) -> Result<String, ProviderError> {
    serde_json::to_string_pretty(&Prompt {
        user_merchants,
        transactions,
    })
    .map_err(|error| ProviderError::internal(format!("failed to encode prompt: {error}")))
}

pub(super) fn schema(transactions: &[TransactionInput]) -> Value {
    let ids: Vec<&str> = transactions.iter().map(|t| t.id.as_str()).collect();
    json!({
        "type": "object",
        "properties": {
            "merchants": {
                "type": "array",
                "description": "An array of auto-detected merchant businesses for each transaction",
                "items": {
                    "type": "object",
                    "properties": {
                        "transaction_id": {
                            "type": "string",
                            "description": "The internal ID of the original transaction",
                            "enum": ids,
                        },
                        "business_name": {
                            "type": ["string", "null"],
                            "description": "The detected business name of the transaction, or `null` if uncertain",
                        },
                        "business_url": {
                            "type": ["string", "null"],
                            "description": "The URL of the detected business, or `null` if uncertain",
                        },
                    },
                    "required": ["transaction_id", "business_name", "business_url"],
                    "additionalProperties": false,
                },
            },
        },
        "required": ["merchants"],
        "additionalProperties": false,
    })
}

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    merchants: Vec<RawMerchant>,
}

#[derive(Debug, Deserialize)]
struct RawMerchant {
    transaction_id: String,
    #[serde(default)]
    business_name: Option<String>,
    #[serde(default)]
    business_url: Option<String>,
}

/// One result per input transaction, in input order.
///
/// A name that matches a user merchant case-insensitively takes the user's spelling.
pub(super) fn normalize(
    reply: Value,
    transactions: &[TransactionInput],
    user_merchants: &[UserMerchant],
) -> Result<Vec<AutoDetectedMerchant>, ProviderError> {
    let reply: Reply = serde_json::from_value(reply)?;
    Ok(transactions
        .iter()
        .map(|transaction| {
            let raw = reply
                .merchants
                .iter()
                .find(|raw| raw.transaction_id == transaction.id);
            let business_name = raw
                .and_then(|raw| present(raw.business_name.as_deref()))
                .map(|name| {
                    user_merchants
                        .iter()
                        .find(|merchant| merchant.name.eq_ignore_ascii_case(name))
                        .map_or_else(|| name.to_owned(), |merchant| merchant.name.clone())
                });
            let business_url = raw
                .and_then(|raw| present(raw.business_url.as_deref()))
                .map(normalize_url);
            AutoDetectedMerchant {
                transaction_id: transaction.id.clone(),
                business_name,
                business_url,
            }
        })
        .collect())
}

fn present(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case("null"))
}

fn normalize_url(url: &str) -> String {
    let without_scheme = url
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let host = without_scheme.split('/').next().unwrap_or(without_scheme);
    host.trim_start_matches("www.").to_ascii_lowercase()
}
