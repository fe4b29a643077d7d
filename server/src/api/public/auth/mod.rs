pub mod login;
pub mod signup;

use loafly_core::ValidationErrors;

pub const MAX_EMAIL_LENGTH: usize = 255;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Emails are stored trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_credentials(email: &str, password: &str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    if email.is_empty() {
        errors.add("email", "Email is required");
    } else if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        errors.add("email", "Email must be a valid email address");
    } else if email.chars().count() > MAX_EMAIL_LENGTH {
        errors.add("email", "Email must not exceed 255 characters");
    }

    let password_len = password.chars().count();
    if password_len < MIN_PASSWORD_LENGTH {
        errors.add("password", "Password must be at least 8 characters");
    } else if password_len > MAX_PASSWORD_LENGTH {
        errors.add("password", "Password must not exceed 128 characters");
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Baker@Example.COM "), "baker@example.com");
    }

    #[test]
    fn test_validate_credentials() {
        assert!(validate_credentials("baker@example.com", "levain123").is_empty());

        let errors = validate_credentials("", "short");
        let fields: Vec<&str> = errors.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["email", "password"]);

        assert!(!validate_credentials("@example.com", "levain123").is_empty());
        assert!(!validate_credentials("baker@example.com", &"x".repeat(129)).is_empty());
    }
}
