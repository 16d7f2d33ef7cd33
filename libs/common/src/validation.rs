//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err(format!("Invalid email format: {}", email));
    }

    Ok(())
}

/// Validate a login password
///
/// Only presence is checked; password policy belongs to registration.
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    Ok(())
}

/// Validate a `YYYY-MM-DD` session date
pub fn validate_session_date(date: &str) -> Result<(), String> {
    static DATE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = DATE_REGEX.get_or_init(|| {
        Regex::new(r"^\d{4}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])$")
            .expect("Failed to compile date regex")
    });

    if !regex.is_match(date) {
        return Err(format!("Session date must be YYYY-MM-DD, got '{}'", date));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("therapist@clinic.org").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign.org").is_err());
        assert!(validate_email("a@b").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("x").is_ok());
        assert!(validate_password("").is_err());
    }

    #[test]
    fn test_validate_session_date() {
        assert!(validate_session_date("2024-03-09").is_ok());
        assert!(validate_session_date("2024-13-01").is_err());
        assert!(validate_session_date("09/03/2024").is_err());
        assert!(validate_session_date("").is_err());
    }
}
