//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates a chat platform identifier (user, channel or message id).
///
/// Identifiers are opaque, but must be non-empty and free of whitespace.
///
/// # Examples
///
/// ```ignore
/// validate_identifier("123456789012345678") // Ok
/// validate_identifier("")                   // Err - empty
/// validate_identifier("12 34")              // Err - whitespace
/// ```
pub fn validate_identifier(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        let mut err = ValidationError::new("identifier_empty");
        err.message = Some("Identifier must not be empty".into());
        return Err(err);
    }

    if id.chars().any(char::is_whitespace) {
        let mut err = ValidationError::new("identifier_format");
        err.message = Some(format!("Identifier must not contain whitespace (got {id:?})").into());
        return Err(err);
    }

    Ok(())
}
