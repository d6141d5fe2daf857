//! # Phone Numbers
//!
//! Users are identified by their phone number, stored as digits only.

use crate::error::{CoreError, CoreResult};

/// Number of trailing digits compared when matching test numbers.
pub const SIGNIFICANT_DIGITS: usize = 10;

/// Strip everything but ASCII digits.
///
/// Fails when nothing is left.
pub fn normalize(raw: &str) -> CoreResult<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(CoreError::validation("Please enter a valid phone number"));
    }
    Ok(digits)
}

/// Whether `phone` is one of the configured test numbers.
///
/// A test number must have exactly ten digits; it matches any phone whose
/// last ten digits equal it, so country prefixes do not matter.
#[must_use]
pub fn matches_test_number<S: AsRef<str>>(phone: &str, test_numbers: &[S]) -> bool {
    let clean: String = phone.chars().filter(char::is_ascii_digit).collect();
    if clean.len() < SIGNIFICANT_DIGITS {
        return false;
    }
    let tail = &clean[clean.len() - SIGNIFICANT_DIGITS..];

    test_numbers.iter().any(|candidate| {
        let candidate: String = candidate
            .as_ref()
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        candidate.len() == SIGNIFICANT_DIGITS && candidate == tail
    })
}

/// Parse a comma separated list of test numbers, dropping blanks.
#[must_use]
pub fn parse_test_numbers(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalize_keeps_digits() {
        assert_eq!(normalize("+225 07-79 13 63 56").unwrap(), "2250779136356");
    }

    #[test]
    fn normalize_rejects_empty() {
        assert!(normalize("call me").is_err());
        assert!(normalize("").is_err());
    }

    #[test]
    fn test_number_matches_last_ten_digits() {
        let list = vec!["0779136356".to_string()];
        assert!(matches_test_number("0779136356", &list));
        assert!(matches_test_number("2250779136356", &list));
        assert!(!matches_test_number("0779136357", &list));
        assert!(!matches_test_number("779136356", &list));
    }

    #[test]
    fn short_test_numbers_never_match() {
        let list = vec!["12345".to_string()];
        assert!(!matches_test_number("0000012345", &list));
    }

    #[test]
    fn parse_list_trims_and_drops_blanks() {
        assert_eq!(
            parse_test_numbers(" 0700000000, ,0711111111 "),
            vec!["0700000000".to_string(), "0711111111".to_string()]
        );
        assert!(parse_test_numbers("").is_empty());
    }

    proptest! {
        #[test]
        fn normalized_output_is_all_digits(raw in ".*") {
            if let Ok(digits) = normalize(&raw) {
                prop_assert!(!digits.is_empty());
                prop_assert!(digits.chars().all(|c| c.is_ascii_digit()));
            }
        }
    }
}
