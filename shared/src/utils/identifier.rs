//! Identifier utilities
//!
//! An identifier is the address a code is delivered to: an email address or
//! a phone number. Records are keyed by the normalized form.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

// E.164: '+' then 8 to 15 digits, no leading zero
static PHONE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+[1-9]\d{7,14}$").expect("phone pattern is valid")
});

/// Channel family an identifier belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    Email,
    Phone,
}

/// Normalize an identifier: trimmed and lower-cased, phone numbers stripped
/// of formatting characters and written in E.164
///
/// Bare digits are read as an international number without its '+'.
pub fn normalize_identifier(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    if lowered.contains('@') {
        return lowered;
    }

    let compact: String = lowered
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();
    let international = if compact.starts_with('+') {
        compact
    } else {
        format!("+{}", compact)
    };
    if PHONE_REGEX.is_match(&international) {
        international
    } else {
        lowered
    }
}

/// Classify a normalized identifier as email or phone
pub fn classify_identifier(identifier: &str) -> Option<IdentifierKind> {
    if EMAIL_REGEX.is_match(identifier) {
        Some(IdentifierKind::Email)
    } else if PHONE_REGEX.is_match(identifier) {
        Some(IdentifierKind::Phone)
    } else {
        None
    }
}

/// Mask an identifier for logs (e.g., jo***@example.com, +14****2671)
pub fn mask_identifier(identifier: &str) -> String {
    if let Some((local, domain)) = identifier.split_once('@') {
        let visible: String = local.chars().take(2).collect();
        return format!("{}***@{}", visible, domain);
    }

    let chars: Vec<char> = identifier.chars().collect();
    if chars.len() >= 7 {
        let head: String = chars[..3].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}****{}", head, tail)
    } else {
        "****".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier("  Alice@Example.COM "), "alice@example.com");
        assert_eq!(normalize_identifier("+1 (415) 555-2671"), "+14155552671");
        assert_eq!(normalize_identifier("86 138-1234-5678"), "+8613812345678");
        assert_eq!(normalize_identifier("14155552671"), "+14155552671");
        assert_eq!(normalize_identifier("0411 222 333"), "0411 222 333");
        assert_eq!(normalize_identifier("Not A Phone"), "not a phone");
    }

    #[test]
    fn test_classify_identifier() {
        assert_eq!(classify_identifier("a@b.com"), Some(IdentifierKind::Email));
        assert_eq!(classify_identifier("+14155552671"), Some(IdentifierKind::Phone));
        assert_eq!(classify_identifier("13812345678"), None);
        assert_eq!(classify_identifier("+1234567"), None);
        assert_eq!(classify_identifier("+0123456789"), None);
        assert_eq!(classify_identifier("a@b"), None);
    }

    #[test]
    fn test_mask_identifier() {
        assert_eq!(mask_identifier("john@example.com"), "jo***@example.com");
        assert_eq!(mask_identifier("+14155552671"), "+14****2671");
        assert_eq!(mask_identifier("12345"), "****");
    }
}
