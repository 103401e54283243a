//! Hand-written field validators shared by the write models.
//!
//! Each helper returns the normalised value or a
//! [`GatewayError::InvalidRequest`] naming the offending field.

use crate::error::GatewayError;

/// Maximum length of free-text name fields.
pub const MAX_NAME_LEN: usize = 100;

fn invalid(field: &str, reason: &str) -> GatewayError {
    GatewayError::InvalidRequest(format!("{field} {reason}"))
}

/// Trims `value` and requires it to be non-empty and at most
/// [`MAX_NAME_LEN`] characters.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] on empty or overlong input.
pub fn required_text(field: &str, value: &str) -> Result<String, GatewayError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid(field, "is required"));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(invalid(field, "is too long"));
    }
    Ok(trimmed.to_string())
}

/// Lower-cases and checks an email address: one `@`, non-empty local part,
/// and a dotted domain.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] if the address is malformed.
pub fn email(value: &str) -> Result<String, GatewayError> {
    let normalized = value.trim().to_ascii_lowercase();
    let mut parts = normalized.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid("email", "is not a valid address"));
    };
    let domain_ok = domain
        .split_once('.')
        .is_some_and(|(head, tail)| !head.is_empty() && !tail.is_empty() && !tail.ends_with('.'));
    if local.is_empty() || !domain_ok || normalized.contains(char::is_whitespace) {
        return Err(invalid("email", "is not a valid address"));
    }
    Ok(normalized)
}

/// Accepts 10–15 digits with an optional leading `+`. Spaces and dashes are
/// stripped before counting.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] if the number is malformed.
pub fn phone(value: &str) -> Result<String, GatewayError> {
    let compact: String = value
        .trim()
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect();
    let digits = compact.strip_prefix('+').unwrap_or(&compact);
    if !(10..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("phone", "must contain 10-15 digits"));
    }
    Ok(compact)
}

/// Upper-cases a station code and requires 3–20 characters of
/// `A-Z`, `0-9` or `-`.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] if the code is malformed.
pub fn station_code(value: &str) -> Result<String, GatewayError> {
    let code = value.trim().to_ascii_uppercase();
    let charset_ok = code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-');
    if !(3..=20).contains(&code.len()) || !charset_ok {
        return Err(invalid("code", "must be 3-20 characters of A-Z, 0-9 or '-'"));
    }
    Ok(code)
}

/// Requires a three-letter upper-case ISO currency code.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] if the code is malformed.
pub fn currency(value: &str) -> Result<String, GatewayError> {
    let code = value.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(invalid("currency", "must be a 3-letter ISO code"));
    }
    Ok(code.to_string())
}

/// Requires a finite value in `(0, max]`.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] if the value is out of range.
pub fn positive(field: &str, value: f64, max: f64) -> Result<f64, GatewayError> {
    if !value.is_finite() || value <= 0.0 || value > max {
        return Err(invalid(field, "is out of range"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_trims_and_rejects_blank() {
        assert_eq!(required_text("name", "  Asha  ").ok().as_deref(), Some("Asha"));
        assert!(required_text("name", "   ").is_err());
        assert!(required_text("name", &"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn email_rules() {
        assert_eq!(email(" Asha@Example.COM ").ok().as_deref(), Some("asha@example.com"));
        for bad in ["", "asha", "@example.com", "asha@example", "a@b@c.com", "a@.com", "a@b."] {
            assert!(email(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn phone_rules() {
        assert_eq!(phone("+91 98765-43210").ok().as_deref(), Some("+919876543210"));
        assert!(phone("12345").is_err());
        assert!(phone("98765abcde").is_err());
    }

    #[test]
    fn station_code_is_upper_cased() {
        assert_eq!(station_code("blr-01").ok().as_deref(), Some("BLR-01"));
        assert!(station_code("ab").is_err());
        assert!(station_code("bad code").is_err());
    }

    #[test]
    fn currency_and_positive() {
        assert!(currency("INR").is_ok());
        assert!(currency("inr").is_err());
        assert!(positive("power_kw", 50.0, 400.0).is_ok());
        assert!(positive("power_kw", 0.0, 400.0).is_err());
        assert!(positive("power_kw", f64::NAN, 400.0).is_err());
    }
}
