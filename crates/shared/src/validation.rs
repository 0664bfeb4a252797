//! Common validation utilities.

use validator::ValidateEmail;

/// Maximum accepted email length (RFC 5321 path limit).
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum accepted subscriber name length.
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum accepted campaign subject length, after trimming.
pub const MAX_SUBJECT_LENGTH: usize = 500;

/// Trims surrounding whitespace and lower-cases an email address.
///
/// All comparisons and uniqueness checks operate on the normalized form.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Validates an already-normalized email address: non-empty, within the
/// length limit and syntactically plausible.
pub fn is_valid_email(email: &str) -> bool {
    !email.is_empty() && email.len() <= MAX_EMAIL_LENGTH && email.validate_email()
}

/// Trims a subscriber name and truncates it to [`MAX_NAME_LENGTH`]
/// characters. Truncation respects char boundaries.
pub fn normalize_name(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.char_indices().nth(MAX_NAME_LENGTH) {
        Some((idx, _)) => trimmed[..idx].to_string(),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
        assert_eq!(normalize_email("a@x.io"), "a@x.io");
    }

    #[test]
    fn accepts_plausible_addresses() {
        assert!(is_valid_email("a@x.io"));
        assert!(is_valid_email("first.last+tag@sub.example.org"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld@twice.com"));
        assert!(!is_valid_email("@example.com"));
    }

    #[test]
    fn rejects_overlong_addresses() {
        let local = "a".repeat(250);
        let email = format!("{local}@example.com");
        assert!(email.len() > MAX_EMAIL_LENGTH);
        assert!(!is_valid_email(&email));
    }

    #[test]
    fn normalize_name_truncates_long_names() {
        let name = "x".repeat(400);
        assert_eq!(normalize_name(&name).len(), MAX_NAME_LENGTH);
        assert_eq!(normalize_name("  Al  "), "Al");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn normalize_name_respects_char_boundaries() {
        let name = "é".repeat(300);
        let normalized = normalize_name(&name);
        assert_eq!(normalized.chars().count(), MAX_NAME_LENGTH);
    }
}
