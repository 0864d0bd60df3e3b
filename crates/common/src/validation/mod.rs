//! Field validators used with `#[validate(custom(...))]`

use chrono::{Datelike, Utc};
use std::borrow::Cow;
use validator::ValidationError;

/// Username reserved for the self-service endpoint
pub const RESERVED_USERNAME: &str = "me";

pub const MIN_YEAR: i32 = -9999;

pub fn current_year() -> i32 {
    Utc::now().year()
}

fn invalid(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Letters, digits and `.@+-_`, and never the reserved "me".
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username == RESERVED_USERNAME {
        return Err(invalid("reserved", "Username 'me' is not allowed"));
    }
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '.' | '@' | '+' | '-' | '_');
    if username.is_empty() || !username.chars().all(allowed) {
        return Err(invalid(
            "username",
            "Enter a valid username: letters, digits and @/./+/-/_ only",
        ));
    }
    Ok(())
}

/// ASCII letters, digits, hyphens and underscores.
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
    if slug.is_empty() || !slug.chars().all(allowed) {
        return Err(invalid(
            "slug",
            "Enter a valid slug: letters, numbers, underscores or hyphens",
        ));
    }
    Ok(())
}

/// Release year between -9999 and the current year.
pub fn validate_year(year: i32) -> Result<(), ValidationError> {
    let max = current_year();
    if year < MIN_YEAR || year > max {
        return Err(invalid(
            "year",
            format!("Year must be between {} and {}", MIN_YEAR, max),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(validate_username("reviewer_1").is_ok());
        assert!(validate_username("a.b+c@d-e").is_ok());
        assert!(validate_username("me").is_err());
        assert!(validate_username("two words").is_err());
        assert!(validate_username("").is_err());
        // Only the exact reserved name is blocked
        assert!(validate_username("meme").is_ok());
    }

    #[test]
    fn test_slug_rules() {
        assert!(validate_slug("science-fiction").is_ok());
        assert!(validate_slug("rock_n_roll").is_ok());
        assert!(validate_slug("Not a slug").is_err());
        assert!(validate_slug("драма").is_err());
    }

    #[test]
    fn test_year_bounds() {
        assert!(validate_year(-9999).is_ok());
        assert!(validate_year(-10000).is_err());
        assert!(validate_year(current_year()).is_ok());
        assert!(validate_year(current_year() + 1).is_err());
    }
}
