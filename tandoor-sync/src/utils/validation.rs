//! Input validation helpers

use crate::utils::ValidationError;

/// Digits in a phone number (local format, no country code)
pub const PHONE_DIGITS: usize = 10;

/// Validate a 10-digit numeric phone number, returning it trimmed
pub fn validate_phone(raw: &str) -> Result<String, ValidationError> {
    let phone = raw.trim();
    if phone.len() == PHONE_DIGITS && phone.bytes().all(|b| b.is_ascii_digit()) {
        Ok(phone.to_string())
    } else {
        Err(ValidationError::InvalidPhone(raw.to_string()))
    }
}

/// Validate a table number against the configured floor size
pub fn validate_table(table_number: u32, max_tables: u32) -> Result<(), ValidationError> {
    if (1..=max_tables).contains(&table_number) {
        Ok(())
    } else {
        Err(ValidationError::InvalidTable {
            table_number,
            max_tables,
        })
    }
}

/// Validate a customer name, returning it trimmed
pub fn validate_customer_name(raw: &str) -> Result<String, ValidationError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyCustomerName);
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone() {
        assert_eq!(validate_phone(" 9876543210 ").unwrap(), "9876543210");
        assert!(validate_phone("987654321").is_err());
        assert!(validate_phone("98765432101").is_err());
        assert!(validate_phone("98765-4321").is_err());
        assert!(validate_phone("").is_err());
        // Non-ASCII digits
        assert!(validate_phone("٩٨٧٦٥٤٣٢١٠").is_err());
    }

    #[test]
    fn test_table_range() {
        assert!(validate_table(1, 20).is_ok());
        assert!(validate_table(20, 20).is_ok());
        assert!(validate_table(0, 20).is_err());
        assert!(validate_table(21, 20).is_err());
    }

    #[test]
    fn test_customer_name() {
        assert_eq!(validate_customer_name("  Asha ").unwrap(), "Asha");
        assert_eq!(
            validate_customer_name("   "),
            Err(ValidationError::EmptyCustomerName)
        );
    }
}
