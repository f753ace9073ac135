//! Normalization helpers for customer-entered text.

use genpay_sdk::objects::charge::PhoneNumber;

use crate::builders::BuildError;

/// Keep ASCII digits only. Used for documents, postcodes and bank codes.
pub fn only_digits(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

/// Replace the Portuguese accented letters the gateway rejects in item
/// references. Other characters pass through untouched.
pub fn strip_diacritics(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'á' | 'à' | 'ã' | 'â' => 'a',
            'é' | 'ê' => 'e',
            'í' => 'i',
            'ó' | 'ô' | 'õ' => 'o',
            'ú' | 'ü' => 'u',
            'ç' => 'c',
            'Á' | 'À' | 'Ã' | 'Â' => 'A',
            'É' | 'Ê' => 'E',
            'Í' => 'I',
            'Ó' | 'Ô' | 'Õ' => 'O',
            'Ú' | 'Ü' => 'U',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}

/// Truncate to at most `max` characters without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Parse a Brazilian phone number written as `(DD) NNNN-NNNN` or
/// `(DD) NNNNN-NNNN`.
///
/// The whole (trimmed) input must match; anything else is rejected.
pub fn parse_phone(raw: &str) -> Result<PhoneNumber, BuildError> {
    let malformed = || BuildError::MalformedPhoneNumber(raw.to_owned());
    let s = raw.trim();

    let rest = s.strip_prefix('(').ok_or_else(malformed)?;
    let (area, rest) = rest.split_once(')').ok_or_else(malformed)?;
    let rest = rest.strip_prefix(' ').ok_or_else(malformed)?;
    let (prefix, suffix) = rest.split_once('-').ok_or_else(malformed)?;

    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if area.len() != 2 || !all_digits(area) {
        return Err(malformed());
    }
    if !(4..=5).contains(&prefix.len()) || !all_digits(prefix) {
        return Err(malformed());
    }
    if suffix.len() != 4 || !all_digits(suffix) {
        return Err(malformed());
    }

    Ok(PhoneNumber {
        country_code: "55".to_owned(),
        area_code: area.to_owned(),
        number: format!("{prefix}{suffix}"),
    })
}
