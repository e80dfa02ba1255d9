//! Phone-number and pairing-code handling for the pairing challenge.

use chatgate_types::error::GatewayError;

/// Length the network requires for a caller-chosen pairing code.
pub const CUSTOM_CODE_LEN: usize = 8;

/// A pairing code and the digits-only phone number it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedPairingCode {
    pub phone_number: String,
    pub code: String,
}

/// Reduce a phone number to its digits. Empty results are rejected.
pub fn pairing_phone_number(raw: &str) -> Result<String, GatewayError> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(GatewayError::InvalidTarget(format!(
            "phone number '{raw}' contains no digits"
        )));
    }
    Ok(digits)
}

/// Validate an optional custom code: blank means none, otherwise exactly
/// eight ASCII alphanumerics, upper-cased.
pub fn custom_pairing_code(raw: Option<&str>) -> Result<Option<String>, GatewayError> {
    let Some(code) = raw.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(None);
    };
    if code.len() != CUSTOM_CODE_LEN || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(GatewayError::invalid(format!(
            "custom pairing code must be {CUSTOM_CODE_LEN} letters or digits"
        )));
    }
    Ok(Some(code.to_ascii_uppercase()))
}

/// Format a raw code for human entry.
///
/// Codes whose length is a non-zero multiple of four and that contain no
/// `-` are split into `-`-joined groups of four. Anything else is returned
/// unchanged.
pub fn format_pairing_code(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    if chars.is_empty() || chars.len() % 4 != 0 || raw.contains('-') {
        return raw.to_string();
    }
    chars
        .chunks(4)
        .map(|group| group.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("-")
}
