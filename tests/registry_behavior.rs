//! Behavior tests for concept resolution and provider lookup.

use finwire_core::{PlaidConfig, PlaidEnvironment, PlaidRegion};
use finwire_tests::{
    fully_configured, Concept, ProviderErrorKind, ProviderId, ProviderRegistry, ProviderSettings,
};

// =============================================================================
// Registry: Concept Validation
// =============================================================================

#[test]
fn when_concept_name_is_unrecognized_registry_construction_fails_with_validation() {
    for name in ["weather", "", "exchange rates", "llms"] {
        // When: a registry is requested for a concept outside the recognized set
        let error = ProviderRegistry::for_concept_name(name, &fully_configured())
            .expect_err("unrecognized concept must fail");

        // Then: the failure is a validation error
        assert_eq!(error.kind(), ProviderErrorKind::Validation, "concept {name:?}");
    }
}

#[test]
fn when_concept_name_uses_dashes_or_capitals_it_still_resolves() {
    let registry = ProviderRegistry::for_concept_name("Exchange-Rates", &fully_configured())
        .expect("normalized concept");
    assert_eq!(registry.concept(), Some(Concept::ExchangeRates));
}

// =============================================================================
// Registry: Availability
// =============================================================================

#[test]
fn when_all_credentials_are_present_resolve_returns_fixed_priority_order() {
    let settings = fully_configured();

    assert_eq!(
        ProviderRegistry::resolve(Concept::ExchangeRates, &settings),
        vec![ProviderId::ExchangeRateHost, ProviderId::Synth]
    );
    assert_eq!(
        ProviderRegistry::resolve(Concept::Securities, &settings),
        vec![ProviderId::Synth]
    );
    assert_eq!(
        ProviderRegistry::resolve(Concept::Llm, &settings),
        vec![ProviderId::OpenAi]
    );
    assert_eq!(
        ProviderRegistry::resolve(Concept::Payments, &settings),
        vec![ProviderId::Stripe]
    );
}

#[test]
fn when_a_credential_is_removed_its_adapter_disappears_from_every_concept() {
    // Given: everything configured except synth
    let settings = ProviderSettings::empty()
        .with_exchange_rate_host_key("erh-test")
        .with_openai_token("sk-test");

    // Then: synth is absent wherever it was registered
    assert_eq!(
        ProviderRegistry::resolve(Concept::ExchangeRates, &settings),
        vec![ProviderId::ExchangeRateHost]
    );
    assert!(ProviderRegistry::resolve(Concept::Securities, &settings).is_empty());
    assert!(ProviderRegistry::resolve(Concept::Payments, &settings).is_empty());
}

#[test]
fn when_only_one_stripe_key_is_present_payments_has_no_provider() {
    let settings = ProviderSettings::from_lookup(|key| match key {
        "STRIPE_SECRET_KEY" => Some(String::from("sk_test")),
        _ => None,
    });
    assert!(ProviderRegistry::resolve(Concept::Payments, &settings).is_empty());
}

#[test]
fn when_self_hosted_flag_is_on_llm_is_available_without_a_token() {
    let settings = ProviderSettings::from_lookup(|key| match key {
        "USE_LM_STUDIO" => Some(String::from("true")),
        _ => None,
    });
    assert_eq!(
        ProviderRegistry::resolve(Concept::Llm, &settings),
        vec![ProviderId::OpenAi]
    );
}

#[test]
fn merchant_enrichment_lists_plaid_regions_before_ai() {
    let plaid = PlaidConfig {
        client_id: String::from("client"),
        secret: String::from("secret"),
        environment: PlaidEnvironment::Sandbox,
    };
    let settings = fully_configured()
        .with_plaid(PlaidRegion::Us, plaid.clone())
        .with_plaid(PlaidRegion::Eu, plaid);

    assert_eq!(
        ProviderRegistry::resolve(Concept::MerchantEnrichment, &settings),
        vec![ProviderId::PlaidUs, ProviderId::PlaidEu, ProviderId::OpenAi]
    );
}

// =============================================================================
// Registry: Lookup Failures
// =============================================================================

#[test]
fn when_provider_name_is_unknown_lookup_fails_with_not_found_naming_it() {
    for concept in Concept::ALL {
        let registry = ProviderRegistry::for_concept(concept, &fully_configured());

        let error = registry
            .get_provider_by_name("nonexistent")
            .err()
            .expect("unknown provider must fail");

        assert_eq!(error.kind(), ProviderErrorKind::NotFound);
        assert!(
            error.message().contains("nonexistent"),
            "message should name the provider: {}",
            error.message()
        );
    }
}

#[test]
fn when_provider_is_unconfigured_lookup_fails_even_though_it_is_registered() {
    let registry = ProviderRegistry::for_concept(Concept::ExchangeRates, &ProviderSettings::empty());

    let error = registry
        .get_provider(ProviderId::Synth)
        .err()
        .expect("unconfigured provider");
    assert_eq!(
        error.message(),
        "Provider 'synth' not found for concept: exchange_rates"
    );
}

#[test]
fn global_lookup_finds_any_configured_adapter() {
    let provider = ProviderRegistry::global_provider_by_name("openai", &fully_configured())
        .expect("configured");
    assert_eq!(provider.id(), ProviderId::OpenAi);

    let error = ProviderRegistry::global_provider_by_name("github", &fully_configured())
        .err()
        .expect("not registered");
    assert_eq!(error.message(), "Provider 'github' not found in registry");
}
