//! Validation utilities

use crate::types::*;

/// Validate that a required setting is present
pub fn validate_required(value: &str, what: &str) -> SyncResult<()> {
    if value.trim().is_empty() {
        return Err(SyncError::Config(format!("{} is required", what)));
    }
    Ok(())
}

/// Validate a payee before it is sent to the ledger
pub fn validate_payee(payee: &str) -> SyncResult<()> {
    if payee.trim().is_empty() {
        return Err(SyncError::Validation("Payee cannot be empty".to_string()));
    }
    Ok(())
}

/// Validate the dedup reference written to the entry
pub fn validate_reference(reference: &str) -> SyncResult<()> {
    if reference.trim().is_empty() {
        return Err(SyncError::Validation(
            "Settlement reference cannot be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_rejects_blank() {
        assert!(validate_required("abc", "Token").is_ok());
        let err = validate_required("   ", "Token").unwrap_err();
        assert!(matches!(err, SyncError::Config(msg) if msg == "Token is required"));
    }

    #[test]
    fn test_payee_must_not_be_blank() {
        assert!(validate_payee("Shop B").is_ok());
        assert!(validate_payee(&"x".repeat(300)).is_ok());
        assert!(validate_payee("").is_err());
        assert!(validate_payee("  ").is_err());
    }

    #[test]
    fn test_reference_must_not_be_blank() {
        assert!(validate_reference("23123401120741221241-01").is_ok());
        assert!(validate_reference("A2.7").is_ok());
        assert!(validate_reference("").is_err());
    }
}
