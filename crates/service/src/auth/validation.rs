//! Input rules shared by registration and password reset.

use validator::{Validate, ValidationError, ValidationErrors};

use super::errors::AuthError;

pub const PASSWORD_MIN: usize = 6;
pub const PASSWORD_MAX: usize = 20;
pub const PASSWORD_RULE: &str =
    "Password must be 6-20 characters long and contain only letters and numbers, with at least one of each";

/// 6-20 ASCII letters or digits, at least one of each.
pub fn password_pattern(value: &str) -> Result<(), ValidationError> {
    let len = value.chars().count();
    let only_alnum = value.chars().all(|c| c.is_ascii_alphanumeric());
    let has_letter = value.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = value.chars().any(|c| c.is_ascii_digit());
    if (PASSWORD_MIN..=PASSWORD_MAX).contains(&len) && only_alnum && has_letter && has_digit {
        return Ok(());
    }
    Err(ValidationError::new("password_pattern").with_message(PASSWORD_RULE.into()))
}

/// First failing message, looking at fields in `order` so the answer is stable.
pub fn first_message(errors: &ValidationErrors, order: &[&str]) -> String {
    let fields = errors.field_errors();
    order
        .iter()
        .filter_map(|name| fields.get(*name))
        .flat_map(|errs| errs.iter())
        .chain(fields.values().flat_map(|errs| errs.iter()))
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid input".to_string())
}

/// Run derive-based validation and collapse the result into one client message.
pub fn validate_input<T: Validate>(input: &T, order: &[&str]) -> Result<(), AuthError> {
    input
        .validate()
        .map_err(|errs| AuthError::Validation(first_message(&errs, order)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_needs_letter_and_digit() {
        assert!(password_pattern("abc123").is_ok());
        assert!(password_pattern("abcdef").is_err());
        assert!(password_pattern("123456").is_err());
    }

    #[test]
    fn password_length_bounds() {
        assert!(password_pattern("ab1").is_err());
        assert!(password_pattern("a1b2c3d4e5f6g7h8i9j0").is_ok());
        assert!(password_pattern("a1b2c3d4e5f6g7h8i9j0k").is_err());
    }

    #[test]
    fn password_rejects_symbols() {
        assert!(password_pattern("abc 123").is_err());
        assert!(password_pattern("abc123!").is_err());
    }
}
