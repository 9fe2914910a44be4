//! Fuzz target for provider configuration parsing.
//!
//! Arbitrary TOML must either fail to parse or yield a configuration whose
//! credentials validate without panicking.

#![no_main]

use fixazurerm::config::ProviderConfig;
use fixazurerm::validate::validate;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(content) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(config) = ProviderConfig::from_toml(content) {
        let result = validate(&config.credentials());
        assert!(result.len() <= 4);
        let _ = config.endpoints.validate();
        let _ = format!("{:?}", config);
    }
});
