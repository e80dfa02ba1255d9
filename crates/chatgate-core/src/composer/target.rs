//! Recipient identifier normalization.

use chatgate_types::error::GatewayError;

/// Normalize a raw recipient into a qualified identifier.
///
/// Bare identifiers (`+1 234-567-8900`) are reduced to digits and `:` and
/// get `@{network_suffix}` appended. Identifiers that already carry a domain
/// keep it, lower-cased; only their local part is stripped.
pub fn normalize_target(raw: &str, network_suffix: &str) -> Result<String, GatewayError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(GatewayError::InvalidTarget("recipient is required".to_string()));
    }

    let (local, domain) = match raw.split_once('@') {
        Some((local, domain)) => (local, domain.trim().to_ascii_lowercase()),
        None => (raw, network_suffix.trim().trim_start_matches('@').to_ascii_lowercase()),
    };

    let local: String = local
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ':')
        .collect();
    if !local.chars().any(|c| c.is_ascii_digit()) {
        return Err(GatewayError::InvalidTarget(format!(
            "'{raw}' contains no digits"
        )));
    }
    if domain.is_empty() || domain.contains('@') {
        return Err(GatewayError::InvalidTarget(format!(
            "'{raw}' has an invalid domain"
        )));
    }

    Ok(format!("{local}@{domain}"))
}
