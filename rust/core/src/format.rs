//! Format tag derivation from resource identifiers.

/// Derive a short format tag from a resource identifier.
///
/// Returns the final `.`-separated segment, or the whole string when no
/// separator is present. No extension normalization and no case folding;
/// total over any input including the empty string.
pub fn derive_format(resource_id: &str) -> &str {
    match resource_id.rsplit_once('.') {
        Some((_, tail)) => tail,
        None => resource_id,
    }
}
