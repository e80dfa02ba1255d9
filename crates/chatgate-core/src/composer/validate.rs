//! Field checks shared by the compose rules. Every failure is an
//! `InvalidIntent` naming the offending field.

use chatgate_types::error::GatewayError;

/// Largest major-unit amount accepted for prices.
const MAX_AMOUNT: f64 = 1e12;

pub(crate) fn required(value: &str, field: &str) -> Result<String, GatewayError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(GatewayError::invalid(format!("'{field}' is required")));
    }
    Ok(value.to_string())
}

pub(crate) fn optional(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub(crate) fn http_url(value: &str, field: &str) -> Result<String, GatewayError> {
    let url = required(value, field)?;
    let lower = url.to_ascii_lowercase();
    let has_host = ["http://", "https://"]
        .iter()
        .any(|scheme| lower.strip_prefix(scheme).is_some_and(|rest| !rest.is_empty()));
    if !has_host {
        return Err(GatewayError::invalid(format!(
            "'{field}' must be an http(s) URL"
        )));
    }
    Ok(url)
}

pub(crate) fn optional_url(value: Option<&String>, field: &str) -> Result<Option<String>, GatewayError> {
    optional(value).map(|url| http_url(&url, field)).transpose()
}

pub(crate) fn phone_digits(value: &str, field: &str) -> Result<String, GatewayError> {
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(GatewayError::invalid(format!(
            "'{field}' must contain a phone number"
        )));
    }
    Ok(digits)
}

pub(crate) fn count_between(len: usize, min: usize, max: usize, field: &str) -> Result<(), GatewayError> {
    if len < min || len > max {
        return Err(GatewayError::invalid(format!(
            "'{field}' must contain between {min} and {max} entries, got {len}"
        )));
    }
    Ok(())
}

/// Upper-cased ISO-4217 style code, or `default` when absent.
pub(crate) fn currency(value: Option<&String>, default: &str) -> Result<String, GatewayError> {
    let code = optional(value).unwrap_or_else(|| default.to_string());
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(GatewayError::invalid(format!(
            "currency '{code}' must be a three-letter code"
        )));
    }
    Ok(code.to_ascii_uppercase())
}

/// Non-negative finite amount scaled to `scale` minor units per major unit.
pub(crate) fn scaled_amount(value: f64, scale: f64, field: &str) -> Result<i64, GatewayError> {
    if !value.is_finite() || !(0.0..=MAX_AMOUNT).contains(&value) {
        return Err(GatewayError::invalid(format!(
            "'{field}' must be a non-negative amount"
        )));
    }
    Ok((value * scale).round() as i64)
}

/// Render cents as `major.minor`.
pub(crate) fn format_cents(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}
