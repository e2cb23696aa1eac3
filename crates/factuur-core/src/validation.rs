//! # Validation Module
//!
//! Input validation for invoice create/update requests. Runs before any
//! state is created so a rejected request never leaves partial rows behind.

use crate::error::ValidationError;
use crate::totals::ItemInput;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a customer name.
///
/// ## Rules
/// - Must not be empty after trimming
/// - Must be at most 200 characters
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "customerName".to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "customerName".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates the line items of an invoice request.
///
/// At least one item must carry a non-blank description or size; an invoice
/// of entirely empty rows is rejected.
pub fn validate_items(items: &[ItemInput]) -> ValidationResult<()> {
    let has_content = items.iter().any(|item| {
        !item.description.trim().is_empty()
            || item
                .size
                .as_deref()
                .map(|s| !s.trim().is_empty())
                .unwrap_or(false)
    });

    if !has_content {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    Ok(())
}

/// Loose email shape check, used before attempting SMTP delivery.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    // The SMTP layer does real mailbox parsing; this only catches obvious
    // junk early.
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must be a valid email address".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::totals::RawNumber;
    use crate::types::VatRate;

    fn item(description: &str, size: Option<&str>) -> ItemInput {
        ItemInput {
            description: description.to_string(),
            size: size.map(str::to_string),
            quantity: RawNumber::Number(1.0),
            unit_price: RawNumber::Number(10.0),
            vat_rate: VatRate::Standard,
        }
    }

    #[test]
    fn test_customer_name_required() {
        assert!(validate_customer_name("Jan Janssens").is_ok());
        assert!(validate_customer_name("").is_err());
        assert!(validate_customer_name("   ").is_err());
    }

    #[test]
    fn test_customer_name_too_long() {
        assert!(validate_customer_name(&"x".repeat(201)).is_err());
        assert!(validate_customer_name(&"x".repeat(200)).is_ok());
    }

    #[test]
    fn test_items_need_description_or_size() {
        assert!(validate_items(&[item("Montage", None)]).is_ok());
        assert!(validate_items(&[item("", Some("205/55 R16"))]).is_ok());
        assert!(validate_items(&[item("", None)]).is_err());
        assert!(validate_items(&[item("", Some("  "))]).is_err());
        assert!(validate_items(&[]).is_err());
    }

    #[test]
    fn test_one_filled_item_is_enough() {
        assert!(validate_items(&[item("", None), item("Balanceren", None)]).is_ok());
    }

    #[test]
    fn test_email_shape() {
        assert!(validate_email("klant@voorbeeld.be").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("geen-adres").is_err());
        assert!(validate_email("@voorbeeld.be").is_err());
        assert!(validate_email("klant@").is_err());
    }
}
