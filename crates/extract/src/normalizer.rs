use chrono::NaiveDate;
use std::collections::HashMap;

use crate::error::DateParseError;

const MONTHS: [(&str, &str, u32); 12] = [
    ("january", "jan", 1),
    ("february", "feb", 2),
    ("march", "mar", 3),
    ("april", "apr", 4),
    ("may", "may", 5),
    ("june", "jun", 6),
    ("july", "jul", 7),
    ("august", "aug", 8),
    ("september", "sep", 9),
    ("october", "oct", 10),
    ("november", "nov", 11),
    ("december", "dec", 12),
];

/// Turns "<day> <month name> <year>" into `YYYY-MM-DD`.
pub struct DateNormalizer {
    /// Lowercased month name or abbreviation -> month number
    months: HashMap<&'static str, u32>,
}

impl DateNormalizer {
    pub fn new() -> Self {
        let mut months = HashMap::new();
        for (name, abbreviation, number) in MONTHS {
            months.insert(name, number);
            months.insert(abbreviation, number);
        }
        months.insert("sept", 9);

        Self { months }
    }

    pub fn normalize(&self, text: &str) -> Result<String, DateParseError> {
        if text.trim().is_empty() {
            return Err(DateParseError::Empty);
        }

        let tokens: Vec<&str> = text.split_whitespace().collect();
        let [day, month, year] = tokens[..] else {
            return Err(DateParseError::TokenCount {
                input: text.to_string(),
                count: tokens.len(),
            });
        };

        let month_number = self
            .month_number(month)
            .ok_or_else(|| DateParseError::UnknownMonth {
                input: text.to_string(),
                month: month.to_string(),
            })?;
        let day_number = parse_digits(text, "day", day, 1..=2)?;
        let year_number = parse_digits(text, "year", year, 4..=4)?;

        let date = NaiveDate::from_ymd_opt(year_number as i32, month_number, day_number)
            .ok_or_else(|| DateParseError::InvalidDate {
                input: text.to_string(),
            })?;

        Ok(date.format("%Y-%m-%d").to_string())
    }

    /// Case-insensitive; one trailing period is tolerated ("Jan.").
    pub fn month_number(&self, name: &str) -> Option<u32> {
        let name = name.strip_suffix('.').unwrap_or(name).to_lowercase();
        self.months.get(name.as_str()).copied()
    }
}

impl Default for DateNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_digits(
    input: &str,
    part: &'static str,
    token: &str,
    width: std::ops::RangeInclusive<usize>,
) -> Result<u32, DateParseError> {
    let invalid = || DateParseError::InvalidNumber {
        input: input.to_string(),
        part,
        token: token.to_string(),
    };

    if !width.contains(&token.len()) || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    token.parse().map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        let normalizer = DateNormalizer::new();

        assert_eq!(normalizer.normalize("12 January 1990").unwrap(), "1990-01-12");
        assert_eq!(normalizer.normalize("5 Mar 2025").unwrap(), "2025-03-05");
        assert_eq!(normalizer.normalize("31 Dec 1999").unwrap(), "1999-12-31");
    }

    #[test]
    fn test_passport_casing_and_spacing() {
        let normalizer = DateNormalizer::new();

        assert_eq!(normalizer.normalize("01 JAN 1985").unwrap(), "1985-01-01");
        assert_eq!(normalizer.normalize("  14   sept. 2031 ").unwrap(), "2031-09-14");
    }

    #[test]
    fn test_rejects_wrong_token_count() {
        let normalizer = DateNormalizer::new();
        let err = normalizer.normalize("January 1990").unwrap_err();

        assert_eq!(
            err,
            DateParseError::TokenCount {
                input: "January 1990".to_string(),
                count: 2
            }
        );
        assert!(err.to_string().contains("January 1990"));
    }

    #[test]
    fn test_rejects_unknown_month() {
        let normalizer = DateNormalizer::new();
        let err = normalizer.normalize("12 Smarch 1990").unwrap_err();

        assert!(matches!(err, DateParseError::UnknownMonth { ref month, .. } if month == "Smarch"));
        assert!(err.to_string().contains("12 Smarch 1990"));
    }

    #[test]
    fn test_rejects_empty() {
        let normalizer = DateNormalizer::new();
        assert_eq!(normalizer.normalize("").unwrap_err(), DateParseError::Empty);
        assert_eq!(normalizer.normalize("   ").unwrap_err(), DateParseError::Empty);
    }

    #[test]
    fn test_rejects_bad_numbers_and_impossible_dates() {
        let normalizer = DateNormalizer::new();

        assert!(matches!(
            normalizer.normalize("1st Jan 1990").unwrap_err(),
            DateParseError::InvalidNumber { part: "day", .. }
        ));
        assert!(matches!(
            normalizer.normalize("12 Jan 90").unwrap_err(),
            DateParseError::InvalidNumber { part: "year", .. }
        ));
        assert!(matches!(
            normalizer.normalize("31 Feb 2020").unwrap_err(),
            DateParseError::InvalidDate { .. }
        ));
        assert!(matches!(
            normalizer.normalize("0 Feb 2020").unwrap_err(),
            DateParseError::InvalidDate { .. }
        ));
    }

    /// Month lookup is a fixed table, not a calendar parse anchored on a
    /// reference year, so every name resolves regardless of locale or year.
    #[test]
    fn test_month_table_is_calendar_independent() {
        let normalizer = DateNormalizer::new();

        for (i, name) in [
            "January", "February", "March", "April", "May", "June", "July", "August",
            "September", "October", "November", "December",
        ]
        .iter()
        .enumerate()
        {
            assert_eq!(normalizer.month_number(name), Some(i as u32 + 1));
            assert_eq!(normalizer.month_number(&name[..3]), Some(i as u32 + 1));
        }
        assert_eq!(normalizer.normalize("29 Feb 2000").unwrap(), "2000-02-29");
        assert_eq!(normalizer.month_number("Janvier"), None);
    }
}
