//! Client-side credential checks run before anything is sent to the server.

use crate::api::ApiError;

/// Minimum password length accepted at login.
pub const MIN_LOGIN_PASSWORD_LENGTH: usize = 6;

/// Minimum password length for new accounts.
pub const MIN_SIGNUP_PASSWORD_LENGTH: usize = 12;

pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 20;

/// Characters that satisfy the "special character" rule for new passwords.
const SPECIAL_CHARS: &str = "!@#$%^&*()_+-=[]{};':\"\\|,.<>/?";

fn invalid(msg: impl Into<String>) -> ApiError {
    ApiError::Validation(msg.into())
}

/// `local@domain.tld` with no whitespace and exactly one `@`.
pub fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.is_empty() {
        return Err(invalid("email is required"));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(invalid("email must not contain whitespace"));
    }
    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| invalid("email must contain '@'"))?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid("email is not valid"));
    }
    // Needs a dot with something on both sides somewhere in the domain
    let dotted = domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len());
    if !dotted {
        return Err(invalid("email domain is not valid"));
    }
    Ok(())
}

pub fn validate_login_password(password: &str) -> Result<(), ApiError> {
    if password.is_empty() {
        return Err(invalid("password is required"));
    }
    if password.chars().count() < MIN_LOGIN_PASSWORD_LENGTH {
        return Err(invalid(format!(
            "password must be at least {} characters",
            MIN_LOGIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

pub fn validate_username(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(invalid("username is required"));
    }
    let len = name.chars().count();
    if len < MIN_USERNAME_LENGTH {
        return Err(invalid(format!(
            "username must be at least {} characters",
            MIN_USERNAME_LENGTH
        )));
    }
    if len > MAX_USERNAME_LENGTH {
        return Err(invalid(format!(
            "username must be at most {} characters",
            MAX_USERNAME_LENGTH
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid("username may only contain letters, digits and underscores"));
    }
    Ok(())
}

/// Strength rules for a new password.
pub fn validate_new_password(password: &str) -> Result<(), ApiError> {
    if password.is_empty() {
        return Err(invalid("password is required"));
    }
    if password.chars().count() < MIN_SIGNUP_PASSWORD_LENGTH {
        return Err(invalid(format!(
            "password must be at least {} characters",
            MIN_SIGNUP_PASSWORD_LENGTH
        )));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(invalid("password needs a lowercase letter"));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(invalid("password needs an uppercase letter"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(invalid("password needs a digit"));
    }
    if !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        return Err(invalid("password needs a special character"));
    }
    Ok(())
}

pub fn validate_password_confirmation(password: &str, confirmation: &str) -> Result<(), ApiError> {
    if confirmation.is_empty() {
        return Err(invalid("password confirmation is required"));
    }
    if password != confirmation {
        return Err(invalid("passwords do not match"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@b.com").is_ok());
        assert!(validate_email("first.last@sub.example.org").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign.com").is_err());
        assert!(validate_email("@b.com").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("a@.com").is_err());
        assert!(validate_email("a@b.").is_err());
        assert!(validate_email("a@b@c.com").is_err());
        assert!(validate_email("a b@c.com").is_err());
    }

    #[test]
    fn test_validate_login_password() {
        assert!(validate_login_password("secret").is_ok());
        assert!(validate_login_password("").is_err());
        assert!(validate_login_password("five5").is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("data_dummy1").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"a".repeat(21)).is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("dash-name").is_err());
        assert!(validate_username("   ").is_err());
    }

    #[test]
    fn test_validate_new_password_rules() {
        assert!(validate_new_password("Str0ng!Passw0rd").is_ok());

        assert!(validate_new_password("Sh0rt!").is_err()); // too short
        assert!(validate_new_password("ALLUPPER123!!").is_err()); // no lowercase
        assert!(validate_new_password("alllower123!!").is_err()); // no uppercase
        assert!(validate_new_password("NoDigitsHere!!").is_err()); // no digit
        assert!(validate_new_password("NoSpecial1234").is_err()); // no special
    }

    #[test]
    fn test_validate_password_confirmation() {
        assert!(validate_password_confirmation("abc", "abc").is_ok());
        assert!(validate_password_confirmation("abc", "").is_err());
        assert!(validate_password_confirmation("abc", "abd").is_err());
    }

    #[test]
    fn test_validation_errors_use_validation_variant() {
        let err = validate_email("nope").unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(err.to_string().starts_with("Invalid input"));
    }
}
