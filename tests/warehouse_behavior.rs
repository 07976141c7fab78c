//! Behavior-driven tests for the enrichment and merchant store.

use finwire_warehouse::{NewEnrichment, NewProviderMerchant, Warehouse, WarehouseConfig, WarehouseError};
use tempfile::tempdir;

fn enrichment(id: &str, source: &str, attribute: &str, value: &str) -> NewEnrichment {
    NewEnrichment {
        enrichable_type: String::from("transaction"),
        enrichable_id: id.to_owned(),
        source: source.to_owned(),
        attribute_name: attribute.to_owned(),
        value: Some(value.to_owned()),
    }
}

fn merchant(name: &str, source: &str) -> NewProviderMerchant {
    NewProviderMerchant {
        name: name.to_owned(),
        source: source.to_owned(),
        website_url: Some(String::from("amazon.com")),
        logo_url: None,
    }
}

// =============================================================================
// Warehouse: Provider Merchants
// =============================================================================

#[test]
fn when_merchant_name_and_source_repeat_insert_fails_with_duplicate() {
    // Given: a fresh warehouse with one AI merchant
    let temp = tempdir().expect("tempdir");
    let warehouse = Warehouse::open(WarehouseConfig::at(temp.path())).expect("open");
    warehouse
        .insert_provider_merchant(&merchant("Amazon", "ai"))
        .expect("first insert");

    // When: the same pair is inserted again
    let error = warehouse
        .insert_provider_merchant(&merchant("Amazon", "ai"))
        .expect_err("duplicate must fail");

    // Then: the failure names the table and the key
    assert!(matches!(
        error,
        WarehouseError::Duplicate {
            table: "provider_merchants",
            ..
        }
    ));

    // And: the same name from another source is a separate merchant
    warehouse
        .insert_provider_merchant(&merchant("Amazon", "plaid"))
        .expect("other source");
    assert_eq!(warehouse.provider_merchants(None).expect("list").len(), 2);
    assert_eq!(warehouse.provider_merchants(Some("ai")).expect("list").len(), 1);
}

#[test]
fn find_or_create_returns_existing_merchant_unchanged() {
    let temp = tempdir().expect("tempdir");
    let warehouse = Warehouse::open(WarehouseConfig::at(temp.path())).expect("open");

    let first = warehouse
        .find_or_create_provider_merchant(&merchant("Netflix", "ai"))
        .expect("create");
    let mut renamed_url = merchant("Netflix", "ai");
    renamed_url.website_url = Some(String::from("netflix.example"));
    let second = warehouse
        .find_or_create_provider_merchant(&renamed_url)
        .expect("find");

    assert_eq!(first.id, second.id);
    assert_eq!(second.website_url.as_deref(), Some("amazon.com"));
}

#[test]
fn when_merchant_name_is_blank_insert_is_rejected() {
    let temp = tempdir().expect("tempdir");
    let warehouse = Warehouse::open(WarehouseConfig::at(temp.path())).expect("open");

    let error = warehouse
        .insert_provider_merchant(&merchant("  ", "ai"))
        .expect_err("blank name");
    assert!(matches!(error, WarehouseError::InvalidRecord(_)));
}

// =============================================================================
// Warehouse: Enrichments
// =============================================================================

#[test]
fn enrichments_are_read_back_by_the_entity_they_describe() {
    let temp = tempdir().expect("tempdir");
    let warehouse = Warehouse::open(WarehouseConfig::at(temp.path())).expect("open");

    warehouse
        .record_enrichment(&enrichment("txn_1", "ai", "merchant_id", "m_1"))
        .expect("record");
    warehouse
        .record_enrichment(&enrichment("txn_1", "plaid", "category", "Food"))
        .expect("record");
    warehouse
        .record_enrichment(&enrichment("txn_2", "ai", "merchant_id", "m_2"))
        .expect("record");

    let rows = warehouse.enrichments_for("transaction", "txn_1").expect("query");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].attribute_name, "category");
    assert_eq!(rows[1].attribute_name, "merchant_id");
    assert!(rows.iter().all(|row| row.enrichable_id == "txn_1"));
    assert!(warehouse
        .enrichments_for("account", "txn_1")
        .expect("query")
        .is_empty());
}

#[test]
fn re_recording_same_attribute_from_same_source_replaces_value() {
    let temp = tempdir().expect("tempdir");
    let warehouse = Warehouse::open(WarehouseConfig::at(temp.path())).expect("open");

    let first = warehouse
        .record_enrichment(&enrichment("txn_1", "ai", "merchant_id", "m_1"))
        .expect("record");
    let second = warehouse
        .record_enrichment(&enrichment("txn_1", "ai", "merchant_id", "m_9"))
        .expect("re-record");

    assert_eq!(first.id, second.id);
    let rows = warehouse.enrichments_for("transaction", "txn_1").expect("query");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value.as_deref(), Some("m_9"));
}

#[test]
fn data_survives_reopening_the_same_home() {
    let temp = tempdir().expect("tempdir");
    {
        let warehouse = Warehouse::open(WarehouseConfig::at(temp.path())).expect("open");
        warehouse.set_setting("SYNTH_API_KEY", "persisted").expect("store");
    }

    let reopened = Warehouse::open(WarehouseConfig::at(temp.path())).expect("reopen");
    assert_eq!(
        reopened.setting("SYNTH_API_KEY").expect("read").as_deref(),
        Some("persisted")
    );
    assert!(reopened.db_path().ends_with("data/warehouse.duckdb"));
}
