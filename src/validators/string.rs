//! String format checks.

use once_cell::sync::Lazy;
use regex::Regex;

use super::ValidationResult;
use crate::config::MIN_PASSWORD_LENGTH;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

static PHONE_KR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^01[0-1|6-9][0-9]{7,8}$").expect("valid KR phone regex"));

static PHONE_US_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{3}[-.]?\d{3}[-.]?\d{4}$").expect("valid US phone regex"));

pub fn validate_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Character classes a password must contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordRules {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digits: bool,
    pub require_special_chars: bool,
}

impl Default for PasswordRules {
    fn default() -> Self {
        Self {
            min_length: MIN_PASSWORD_LENGTH as usize,
            require_uppercase: true,
            require_lowercase: true,
            require_digits: true,
            require_special_chars: true,
        }
    }
}

/// Checks run in order; the first failing rule is reported.
pub fn validate_password_strength(password: &str, rules: &PasswordRules) -> ValidationResult {
    if password.chars().count() < rules.min_length {
        return Err(format!(
            "Password must be at least {} characters long",
            rules.min_length
        ));
    }
    if rules.require_uppercase && !password.chars().any(char::is_uppercase) {
        return Err("Password must contain at least one uppercase letter".to_string());
    }
    if rules.require_lowercase && !password.chars().any(char::is_lowercase) {
        return Err("Password must contain at least one lowercase letter".to_string());
    }
    if rules.require_digits && !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit".to_string());
    }
    if rules.require_special_chars && !password.chars().any(|c| !c.is_alphanumeric()) {
        return Err("Password must contain at least one special character".to_string());
    }
    Ok(())
}

/// Phone number check for a supported country (`KR`, `US`).
pub fn validate_phone_number(phone: &str, country_code: &str) -> Result<bool, String> {
    let re = match country_code {
        "KR" => &*PHONE_KR_RE,
        "US" => &*PHONE_US_RE,
        other => return Err(format!("Unsupported country code: {}", other)),
    };
    Ok(re.is_match(phone))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email() {
        assert!(validate_email("user@example.com"));
        assert!(validate_email("first.last+tag@sub.example.co"));
        assert!(!validate_email("user@example"));
        assert!(!validate_email("user example@test.com"));
        assert!(!validate_email("@example.com"));
    }

    #[test]
    fn test_password_strength_reports_first_failure() {
        let rules = PasswordRules::default();

        assert!(validate_password_strength("Str0ng!Pass", &rules).is_ok());
        assert!(validate_password_strength("Sh0rt!", &rules)
            .unwrap_err()
            .contains("at least 8"));
        assert!(validate_password_strength("lowercase1!", &rules)
            .unwrap_err()
            .contains("uppercase"));
        assert!(validate_password_strength("UPPERCASE1!", &rules)
            .unwrap_err()
            .contains("lowercase"));
        assert!(validate_password_strength("NoDigits!!", &rules)
            .unwrap_err()
            .contains("digit"));
        assert!(validate_password_strength("NoSpecial12", &rules)
            .unwrap_err()
            .contains("special"));
    }

    #[test]
    fn test_password_rules_can_be_relaxed() {
        let rules = PasswordRules {
            require_special_chars: false,
            require_uppercase: false,
            ..PasswordRules::default()
        };
        assert!(validate_password_strength("simple123", &rules).is_ok());
    }

    #[test]
    fn test_phone_numbers() {
        assert_eq!(validate_phone_number("01012345678", "KR"), Ok(true));
        assert_eq!(validate_phone_number("0161234567", "KR"), Ok(true));
        assert_eq!(validate_phone_number("02-123-4567", "KR"), Ok(false));
        assert_eq!(validate_phone_number("555-123-4567", "US"), Ok(true));
        assert_eq!(validate_phone_number("555.123.4567", "US"), Ok(true));
        assert_eq!(validate_phone_number("5551234567", "US"), Ok(true));
        assert_eq!(validate_phone_number("55-123-4567", "US"), Ok(false));
        assert!(validate_phone_number("123", "JP").is_err());
    }
}
