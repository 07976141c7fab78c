use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{AutoCategorization, ProviderError, TransactionInput, UserCategory};

pub(super) const SCHEMA_NAME: &str = "auto_categorize_personal_finance_transactions";

pub(super) const INSTRUCTIONS: &str = "\
You are an assistant to a consumer personal finance app. You will be provided a list \
of the user's transactions and a list of the user's categories. Your job is to \
auto-categorize each transaction.

Closely follow ALL the rules below:

- Return one result per transaction
- Correlate each transaction by ID (transaction_id)
- Attempt to match the most specific category possible (i.e. subcategory over parent category)
- Category and transaction classifications should match (i.e. if transaction is an \"expense\", \
the category must have classification of \"expense\")
- If you don't know the category, return \"null\"
  - You should always favor \"null\" over false positives
  - Be slightly pessimistic. Only match a category if you're 60%+ confident it is the correct one.
- Each transaction has varying metadata that can be used to determine the category
  - Note: \"hint\" comes from 3rd party aggregators and typically represents a category name that \
may or may not match any of the user-supplied categories
";

#[derive(Serialize)]
struct Prompt<'a> {
    user_categories: &'a [UserCategory],
    transactions: &'a [TransactionInput],
}

pub(super) fn prompt(
    transactions: &[TransactionInput],
    user_categories: &[UserCategory],
) -> Result<String, ProviderError> {
    serde_json::to_string_pretty(&Prompt {
        user_categories,
        transactions,
    })
    .map_err(|error| ProviderError::internal(format!("failed to encode prompt: {error}")))
}

pub(super) fn schema(transactions: &[TransactionInput], user_categories: &[UserCategory]) -> Value {
    let ids: Vec<&str> = transactions.iter().map(|t| t.id.as_str()).collect();
    let mut names: Vec<&str> = user_categories.iter().map(|c| c.name.as_str()).collect();
    names.push("null");

    json!({
        "type": "object",
        "properties": {
            "categorizations": {
                "type": "array",
                "description": "An array of auto-categorizations for each transaction",
                "items": {
                    "type": "object",
                    "properties": {
                        "transaction_id": {
                            "type": "string",
                            "description": "The internal ID of the original transaction",
                            "enum": ids,
                        },
                        "category_name": {
                            "type": "string",
                            "description": "The matched category name of the transaction, or null if no match",
                            "enum": names,
                        },
                    },
                    "required": ["transaction_id", "category_name"],
                    "additionalProperties": false,
                },
            },
        },
        "required": ["categorizations"],
        "additionalProperties": false,
    })
}

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    categorizations: Vec<RawCategorization>,
}

#[derive(Debug, Deserialize)]
struct RawCategorization {
    transaction_id: String,
    #[serde(default)]
    category_name: Option<String>,
}

/// One result per input transaction, in input order.
///
/// `"null"` and names outside `user_categories` become `None`.
pub(super) fn normalize(
    reply: Value,
    transactions: &[TransactionInput],
    user_categories: &[UserCategory],
) -> Result<Vec<AutoCategorization>, ProviderError> {
    let reply: Reply = serde_json::from_value(reply)?;
    Ok(transactions
        .iter()
        .map(|transaction| {
            let category_name = reply
                .categorizations
                .iter()
                .find(|raw| raw.transaction_id == transaction.id)
                .and_then(|raw| raw.category_name.as_deref())
                .and_then(|name| {
                    user_categories
                        .iter()
                        .find(|category| category.name == name)
                        .map(|category| category.name.clone())
                });
            AutoCategorization {
                transaction_id: transaction.id.clone(),
                category_name,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Classification;

    fn transaction(id: &str) -> TransactionInput {
        TransactionInput {
            id: id.to_owned(),
            name: String::from("Whole Foods"),
            amount: 45.2,
            classification: Classification::Expense,
            merchant: None,
            hint: None,
        }
    }

    fn category(name: &str) -> UserCategory {
        UserCategory {
            id: format!("cat_{name}"),
            name: name.to_owned(),
            classification: Classification::Expense,
            is_subcategory: false,
            parent_id: None,
        }
    }

    #[test]
    fn schema_restricts_names_to_user_categories_plus_null() {
        let value = schema(&[transaction("t1")], &[category("Groceries")]);
        let names = &value["properties"]["categorizations"]["items"]["properties"]
            ["category_name"]["enum"];
        assert_eq!(names, &json!(["Groceries", "null"]));
    }

    #[test]
    fn normalizes_null_unknown_and_missing_results() {
        let transactions = [transaction("t1"), transaction("t2"), transaction("t3"), transaction("t4")];
        let reply = json!({"categorizations": [
            {"transaction_id": "t1", "category_name": "Groceries"},
            {"transaction_id": "t2", "category_name": "null"},
            {"transaction_id": "t3", "category_name": "Invented"},
        ]});

        let results = normalize(reply, &transactions, &[category("Groceries")]).expect("normalize");
        let names: Vec<Option<&str>> = results
            .iter()
            .map(|result| result.category_name.as_deref())
            .collect();
        assert_eq!(names, vec![Some("Groceries"), None, None, None]);
        assert_eq!(results[3].transaction_id, "t4");
    }
}
