//! Location and name normalization helpers for resource handlers.

/// Normalise a human-readable region name ("West US") to the form the Azure
/// API uses and returns ("westus").
///
/// State tracks the API form because going from the human form to the
/// canonical one is unambiguous, while the reverse is not.
pub fn normalize_location(location: &str) -> String {
    location.to_lowercase().replace(' ', "")
}

/// Returns true if two resource group names differ only by case.
///
/// Resource group names may be capitalised by the user but are stored in
/// lowercase, so such a change must not force a new resource.
pub fn resource_group_names_equal(old: &str, new: &str) -> bool {
    old.to_lowercase() == new.to_lowercase()
}
