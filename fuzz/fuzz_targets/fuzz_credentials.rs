//! Fuzz target for credential validation.
//!
//! The number of violations must equal the number of empty required fields,
//! and secrets must never appear in debug output.

#![no_main]

use arbitrary::Arbitrary;
use fixazurerm::credentials::CredentialSet;
use fixazurerm::validate::validate;
use libfuzzer_sys::fuzz_target;

/// Arbitrary credential fields for fuzzing
#[derive(Debug, Clone, Arbitrary)]
struct FuzzCredentials {
    subscription_id: String,
    client_id: String,
    client_secret: String,
    tenant_id: String,
    access_key: String,
}

fuzz_target!(|input: FuzzCredentials| {
    let credentials = CredentialSet::new(
        input.subscription_id.clone(),
        input.client_id.clone(),
        input.client_secret.clone(),
        input.tenant_id.clone(),
    )
    .with_access_key(input.access_key.clone());

    let expected = [
        &input.subscription_id,
        &input.client_id,
        &input.client_secret,
        &input.tenant_id,
    ]
    .iter()
    .filter(|field| field.is_empty())
    .count();

    let result = validate(&credentials);
    assert_eq!(result.len(), expected);
    assert_eq!(result.is_valid(), expected == 0);

    let unique_secret = input.client_secret.len() > 16
        && ![&input.subscription_id, &input.client_id, &input.tenant_id]
            .iter()
            .any(|field| field.contains(input.client_secret.as_str()));
    if unique_secret {
        let debug = format!("{:?}", credentials);
        assert!(!debug.contains(&input.client_secret));
    }
});
