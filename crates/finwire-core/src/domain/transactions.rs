use serde::{Deserialize, Serialize};

/// Whether money left or entered the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Expense,
    Income,
}

/// Transaction as submitted for AI categorization or merchant detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub id: String,
    pub name: String,
    pub amount: f64,
    pub classification: Classification,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Category defined by the user; the AI may only choose from these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCategory {
    pub id: String,
    pub name: String,
    pub classification: Classification,
    #[serde(default)]
    pub is_subcategory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMerchant {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoCategorization {
    pub transaction_id: String,
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoDetectedMerchant {
    pub transaction_id: String,
    pub business_name: Option<String>,
    pub business_url: Option<String>,
}

/// Transaction submitted to a vendor enrichment endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentInput {
    pub id: String,
    pub description: String,
    pub amount: f64,
    pub classification: Classification,
    pub currency: crate::CurrencyCode,
}

/// Merchant details a vendor attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEnrichment {
    pub transaction_id: String,
    pub merchant_name: Option<String>,
    pub website: Option<String>,
    pub logo_url: Option<String>,
    pub category: Option<String>,
}
