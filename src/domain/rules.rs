//! Field rules shared by the post, comment and account forms.

use super::error::DomainError;

pub const MAX_USERNAME_LEN: usize = 150;
pub const MIN_PASSWORD_LEN: usize = 8;

/// Trim the input and reject blank text.
pub fn require_text(field: &'static str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::blank(field));
    }
    Ok(trimmed.to_string())
}

/// Usernames are 1..=150 characters of letters, digits and `@.+-_`.
pub fn validate_username(value: &str) -> Result<String, DomainError> {
    let username = require_text("username", value)?;
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(DomainError::too_long("username", MAX_USERNAME_LEN));
    }
    let valid = username
        .chars()
        .all(|ch| ch.is_alphanumeric() || matches!(ch, '@' | '.' | '+' | '-' | '_'));
    if !valid {
        return Err(DomainError::InvalidUsername { value: username });
    }
    Ok(username)
}
