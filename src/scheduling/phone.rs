//! Phone canonicalisation and free-text extraction.

use std::sync::LazyLock;

use regex::Regex;

/// Canonicalise a phone number.
///
/// Keeps digits only. Eleven digits with a leading `1` lose the country code;
/// nine digits gain a leading `0`. Every other result passes through, which
/// keeps the function idempotent.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        11 if digits.starts_with('1') => digits[1..].to_owned(),
        9 => format!("0{digits}"),
        _ => digits,
    }
}

/// Whether `raw` canonicalises to a ten-digit number.
pub fn is_valid_phone(raw: &str) -> bool {
    normalize_phone(raw).len() == 10
}

static PHONE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // (NNN) NNN-NNNN with optional separators and country code
        r"\+?1?[-.\s]?\(?([0-9]{3})\)?[-.\s]?([0-9]{3})[-.\s]?([0-9]{4})",
        // NNN-NNN-NNNN
        r"\+?1?[-.\s]?([0-9]{3})[-.\s]?([0-9]{3})[-.\s]?([0-9]{4})",
        r"([0-9]{10})",
        r"\+?([0-9]{11})",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Extract a ten-digit phone number from free text.
///
/// Patterns are tried in order and the first acceptable capture wins. As a
/// last resort all digits in the text are considered together.
pub fn extract_phone(text: &str) -> Option<String> {
    for pattern in PHONE_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            let joined: String = caps
                .iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str())
                .collect();
            if let Some(phone) = accept_digits(&joined) {
                return Some(phone);
            }
        }
    }

    let all_digits: String = text.chars().filter(char::is_ascii_digit).collect();
    accept_digits(&all_digits)
}

fn accept_digits(digits: &str) -> Option<String> {
    match digits.len() {
        10 => Some(digits.to_owned()),
        11 if digits.starts_with('1') => Some(digits[1..].to_owned()),
        _ => None,
    }
}
