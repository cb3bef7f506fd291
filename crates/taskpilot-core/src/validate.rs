// Local field validation
//
// These rules run before any network call; a validation failure never
// reaches the transport layer.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ClientError, Result};

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9]+(\.[A-Za-z0-9]+)*@[A-Za-z0-9]+(\.[A-Za-z0-9]+)*\.(com|co|uk|in|org|net|io|co\.uk|co\.in)$",
        )
        .expect("email regex is valid")
    })
}

/// Lowercase and trim an email before validation or submission
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate an email address
pub fn validate_email(email: &str) -> Result<()> {
    if email.trim().is_empty() {
        return Err(ClientError::validation("Email is required"));
    }
    if !email_regex().is_match(email.trim()) {
        return Err(ClientError::validation("Invalid email format"));
    }
    Ok(())
}

/// Validate password strength: min 8 chars, at least one lowercase, one
/// uppercase, one digit and one special from `@$!%*?&`
///
/// The regex crate has no lookahead, so the rule is checked as character
/// class tests over the allowed alphabet.
pub fn validate_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(ClientError::validation("Password is required"));
    }

    const SPECIALS: &str = "@$!%*?&";
    let allowed = |c: char| c.is_ascii_alphanumeric() || SPECIALS.contains(c);
    let strong = password.len() >= 8
        && password.chars().all(allowed)
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| SPECIALS.contains(c));

    if !strong {
        return Err(ClientError::validation(
            "Min 8 chars, 1 uppercase, 1 number, 1 special",
        ));
    }
    Ok(())
}

/// Validate that both password fields match
pub fn validate_password_match(password: &str, confirm: &str) -> Result<()> {
    if password != confirm {
        return Err(ClientError::validation("Passwords do not match"));
    }
    Ok(())
}

/// Validate a submitted OTP code
pub fn validate_otp(otp: &str) -> Result<()> {
    if otp.trim().is_empty() {
        return Err(ClientError::validation("OTP is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_emails() {
        assert!(validate_email("user@test.com").is_ok());
        assert!(validate_email("first.last@mail.example.io").is_ok());
        assert!(validate_email("a@b.co.uk").is_ok());
    }

    #[test]
    fn rejects_bad_emails() {
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign.com").is_err());
        assert!(validate_email("user@host").is_err());
        assert!(validate_email("user@host.xyz").is_err());
        assert!(validate_email("user name@test.com").is_err());
    }

    #[test]
    fn normalize_email_lowercases_and_trims() {
        assert_eq!(normalize_email("  Asha@Test.COM "), "asha@test.com");
    }

    #[test]
    fn password_strength_rule() {
        assert!(validate_password("Aa1!aaaa").is_ok());
        assert!(validate_password("").is_err());
        assert!(validate_password("short1!").is_err());
        assert!(validate_password("alllower1!").is_err());
        assert!(validate_password("ALLUPPER1!").is_err());
        assert!(validate_password("NoDigits!!").is_err());
        assert!(validate_password("NoSpecial11").is_err());
        // Characters outside the allowed alphabet disqualify
        assert!(validate_password("Aa1!aaaa#").is_err());
    }

    #[test]
    fn password_match_and_otp_presence() {
        assert!(validate_password_match("Aa1!aaaa", "Aa1!aaaa").is_ok());
        assert!(validate_password_match("Aa1!aaaa", "other").is_err());
        assert!(validate_otp("123456").is_ok());
        assert!(validate_otp("   ").is_err());
    }
}
