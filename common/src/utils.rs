use std::borrow::Cow;

use validator::ValidationError;

pub const TITLE_MIN_LEN: usize = 3;
pub const TITLE_MAX_LEN: usize = 100;

/// Emails are stored and looked up trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trims an optional string, mapping blank input to `None`.
pub fn trim_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    let len = title.chars().count();
    if len == 0 {
        return Err(ValidationError::new("required").with_message(Cow::Borrowed("Title is required")));
    }
    if !(TITLE_MIN_LEN..=TITLE_MAX_LEN).contains(&len) {
        return Err(ValidationError::new("length")
            .with_message(Cow::Borrowed("Title must be between 3 and 100 characters")));
    }
    Ok(())
}
