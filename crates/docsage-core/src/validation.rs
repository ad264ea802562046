//! Input validation helpers.
//!
//! Validation failures surface verbatim to the caller as `AppError::Validation`
//! (400), before any store access happens.

use crate::error::AppError;
use crate::models::SignupRequest;
use validator::ValidateEmail;

/// Minimum password length accepted at signup.
pub const MIN_PASSWORD_CHARS: usize = 8;

/// Validate a signup request: all fields present, email well-formed, password
/// long enough.
pub fn validate_signup(request: &SignupRequest) -> Result<(), AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    if request.email.trim().is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }
    if !request.email.validate_email() {
        return Err(AppError::Validation(format!(
            "Invalid email address: {}",
            request.email
        )));
    }
    if request.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_CHARS
        )));
    }
    Ok(())
}

/// Validate and normalize a conversation title: trims whitespace, rejects an
/// empty result.
pub fn validate_title(title: &str) -> Result<String, AppError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Title must not be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(name: &str, email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn accepts_well_formed_signup() {
        assert!(validate_signup(&signup("Ada", "ada@example.com", "correcthorse")).is_ok());
    }

    #[test]
    fn rejects_missing_fields() {
        assert!(validate_signup(&signup("", "ada@example.com", "correcthorse")).is_err());
        assert!(validate_signup(&signup("Ada", "", "correcthorse")).is_err());
    }

    #[test]
    fn rejects_malformed_email() {
        assert!(validate_signup(&signup("Ada", "not-an-email", "correcthorse")).is_err());
    }

    #[test]
    fn rejects_short_password() {
        assert!(validate_signup(&signup("Ada", "ada@example.com", "short")).is_err());
    }

    #[test]
    fn title_is_trimmed() {
        assert_eq!(validate_title("  Quarterly report  ").unwrap(), "Quarterly report");
    }

    #[test]
    fn whitespace_only_title_is_rejected() {
        assert!(validate_title("   \t ").is_err());
        assert!(validate_title("").is_err());
    }
}
