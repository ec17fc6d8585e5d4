//! Phone-number canonicalization and lookup variants.
//!
//! Stored lead numbers are free-form, so a lookup queries several textual
//! renderings of the same number. Formats outside [`variants`] are not matched.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Country-code prefixes recognised by [`normalize`], as `(prefix, exact total length)`.
/// `None` means "any length above ten digits".
const COUNTRY_CODES: [(&str, Option<usize>); 3] = [("91", Some(12)), ("1", Some(11)), ("44", None)];

const NATIONAL_LEN: usize = 10;

/// Digit-only form of a phone number: ten digits when a national number can be
/// derived, otherwise every digit of the original input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalNumber(String);

impl CanonicalNumber {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the number is a full ten-digit national number.
    #[must_use]
    pub fn is_national(&self) -> bool {
        self.0.len() == NATIONAL_LEN
    }
}

impl fmt::Display for CanonicalNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Strips punctuation and a known country-code prefix.
///
/// At most one prefix is removed (India `91`, North America `1`, UK `44`, checked in
/// that order). When the trimmed result is shorter than ten digits the untrimmed
/// digits are returned instead.
#[must_use]
pub fn normalize(raw: &str) -> CanonicalNumber {
    let digits = digits_only(raw);

    let trimmed = COUNTRY_CODES
        .iter()
        .find(|(prefix, len)| {
            digits.starts_with(prefix)
                && match len {
                    Some(exact) => digits.len() == *exact,
                    None => digits.len() > NATIONAL_LEN,
                }
        })
        .map(|(prefix, _)| &digits[prefix.len()..]);

    if let Some(rest) = trimmed {
        if rest.len() >= NATIONAL_LEN {
            return CanonicalNumber(rest.to_string());
        }
    }
    CanonicalNumber(digits)
}

fn split_national(digits: &str) -> (&str, &str, &str) {
    (&digits[..3], &digits[3..6], &digits[6..])
}

/// Renderings of `raw` to try against the lead store, most specific first.
///
/// Order: canonical digits, then for ten-digit numbers `91`/`1` prefixed forms and
/// the `XXX-XXX-XXXX`, `XXX XXX XXXX`, `(XXX) XXX-XXXX` layouts, then the raw input.
/// Duplicates keep their first position.
#[must_use]
pub fn variants(raw: &str) -> Vec<String> {
    let canonical = normalize(raw);
    let digits = canonical.as_str();

    let mut candidates = vec![digits.to_string()];
    if canonical.is_national() {
        let (area, exchange, line) = split_national(digits);
        candidates.push(format!("91{digits}"));
        candidates.push(format!("1{digits}"));
        candidates.push(format!("{area}-{exchange}-{line}"));
        candidates.push(format!("{area} {exchange} {line}"));
        candidates.push(format!("({area}) {exchange}-{line}"));
    }
    candidates.push(raw.to_string());

    let mut out: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !candidate.is_empty() && !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    out
}

/// `XXX-XXX-XXXX` for ten digits, `+<cc> XXX-XXX-XXXX` for longer digit strings.
/// Anything shorter is returned unchanged.
#[must_use]
pub fn format_dashed(number: &str) -> String {
    let len = number.len();
    if !number.chars().all(|c| c.is_ascii_digit()) {
        return number.to_string();
    }
    if len == NATIONAL_LEN {
        let (area, exchange, line) = split_national(number);
        format!("{area}-{exchange}-{line}")
    } else if len > NATIONAL_LEN {
        let split = len - NATIONAL_LEN;
        format!("+{} {}", &number[..split], format_dashed(&number[split..]))
    } else {
        number.to_string()
    }
}

/// Compact display form of a stored phone number: the canonical ten digits, a
/// `+<cc> ` prefix for longer canonical numbers, or the input untouched.
#[must_use]
pub fn format_display(raw: &str) -> String {
    let canonical = normalize(raw);
    let digits = canonical.as_str();
    if canonical.is_national() {
        digits.to_string()
    } else if digits.len() > NATIONAL_LEN {
        let split = digits.len() - NATIONAL_LEN;
        format!("+{} {}", &digits[..split], &digits[split..])
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_india_country_code() {
        assert_eq!(normalize("+91 98765 43210").as_str(), "9876543210");
        assert_eq!(normalize("919876543210").as_str(), "9876543210");
    }

    #[test]
    fn strips_north_america_country_code() {
        assert_eq!(normalize("11234567890").as_str(), "1234567890");
        assert_eq!(normalize("+1 (415) 555-1212").as_str(), "4155551212");
    }

    #[test]
    fn strips_uk_country_code() {
        assert_eq!(normalize("+44 7911 123456").as_str(), "7911123456");
    }

    #[test]
    fn short_numbers_keep_all_digits() {
        assert_eq!(normalize("12345").as_str(), "12345");
        assert_eq!(normalize("*#12-3").as_str(), "123");
        assert_eq!(normalize("").as_str(), "");
    }

    #[test]
    fn uk_prefix_that_would_leave_too_few_digits_is_kept() {
        // 44 + nine digits: trimming leaves nine, so the untrimmed digits win
        assert_eq!(normalize("44791112345").as_str(), "44791112345");
    }

    #[test]
    fn ten_digit_numbers_pass_through() {
        assert_eq!(normalize("987-654-3210").as_str(), "9876543210");
        assert_eq!(normalize("9198765432").as_str(), "9198765432");
    }

    #[test]
    fn normalize_is_idempotent_for_national_results() {
        for raw in [
            "+91 98765 43210",
            "11234567890",
            "(415) 555-1212",
            "+44 7911 123456",
            "44791112345",
            "1234567890",
        ] {
            let once = normalize(raw);
            assert_eq!(normalize(once.as_str()), once, "input {raw}");
        }
    }

    #[test]
    fn variants_cover_prefixes_and_layouts() {
        assert_eq!(
            variants("+91 98765 43210"),
            vec![
                "9876543210",
                "919876543210",
                "19876543210",
                "987-654-3210",
                "987 654 3210",
                "(987) 654-3210",
                "+91 98765 43210",
            ]
        );
    }

    #[test]
    fn variants_deduplicate_raw_input() {
        let out = variants("9876543210");
        assert_eq!(out.len(), 6);
        assert_eq!(out[0], "9876543210");
        assert_eq!(out.last().map(String::as_str), Some("(987) 654-3210"));
    }

    #[test]
    fn short_numbers_only_try_digits_and_raw() {
        assert_eq!(variants("12-345"), vec!["12345", "12-345"]);
    }

    #[test]
    fn dashed_formatting() {
        assert_eq!(format_dashed("9876543210"), "987-654-3210");
        assert_eq!(format_dashed("919876543210"), "+91 987-654-3210");
        assert_eq!(format_dashed("12345"), "12345");
        assert_eq!(format_dashed("Unknown Number"), "Unknown Number");
    }

    #[test]
    fn display_formatting() {
        assert_eq!(format_display("+91 98765 43210"), "9876543210");
        assert_eq!(format_display("4412345678901"), "+1 2345678901");
        assert_eq!(format_display("12-345"), "12-345");
    }
}
