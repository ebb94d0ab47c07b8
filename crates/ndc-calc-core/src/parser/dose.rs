//! Dose amounts: decimals, fractions, number words and ranges.

use crate::vocabulary::number_word;

/// Regex fragment matching one dose amount.
pub(crate) const AMOUNT_PATTERN: &str =
    r"(?:\d+(?:\.\d+)?(?:/\d+)?|\.\d+|(?:half|one|two|three|four|five|six|seven|eight|nine|ten)\b)";

/// A dose amount, possibly collapsed from a range.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Dose {
    pub value: f64,
    pub note: Option<String>,
}

impl Dose {
    /// Build from a lower bound and optional upper bound; ranges use the upper bound.
    pub fn from_bounds(lower: &str, upper: Option<&str>) -> Option<Self> {
        let lower = parse_amount(lower)?;
        match upper {
            None => Some(Self {
                value: lower,
                note: None,
            }),
            Some(upper) => {
                let upper = parse_amount(upper)?;
                let value = lower.max(upper);
                Some(Self {
                    value,
                    note: Some(format!(
                        "dose range {}-{} given; using the upper bound {}",
                        lower, upper, value
                    )),
                })
            }
        }
    }

    /// Split a single token such as `"2"`, `"1-2"` or `"500mg"` into a dose and
    /// whatever unit text follows the number.
    pub fn from_token(token: &str) -> Option<(Self, &str)> {
        if let Some(value) = number_word(token) {
            return Some((Self { value, note: None }, ""));
        }

        let split = token
            .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '/' | '-')))
            .unwrap_or(token.len());
        let (number, suffix) = token.split_at(split);
        if number.is_empty() {
            return None;
        }

        let mut bounds = number.splitn(2, '-');
        let lower = bounds.next()?;
        let dose = Self::from_bounds(lower, bounds.next())?;
        Some((dose, suffix))
    }
}

/// Parse one amount: `"2"`, `"0.5"`, `".5"`, `"1/2"`, `"two"`, `"half"`.
pub(crate) fn parse_amount(text: &str) -> Option<f64> {
    let text = text.trim();
    if let Some(value) = number_word(text) {
        return Some(value);
    }

    if let Some((numerator, denominator)) = text.split_once('/') {
        let numerator: f64 = numerator.parse().ok()?;
        let denominator: f64 = denominator.parse().ok()?;
        if denominator == 0.0 {
            return None;
        }
        return Some(numerator / denominator);
    }

    let value: f64 = if text.starts_with('.') {
        format!("0{}", text).parse().ok()?
    } else {
        text.parse().ok()?
    };
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("2"), Some(2.0));
        assert_eq!(parse_amount("0.5"), Some(0.5));
        assert_eq!(parse_amount(".5"), Some(0.5));
        assert_eq!(parse_amount("1/2"), Some(0.5));
        assert_eq!(parse_amount("two"), Some(2.0));
        assert_eq!(parse_amount("half"), Some(0.5));
        assert_eq!(parse_amount("1/0"), None);
        assert_eq!(parse_amount("abc"), None);
    }

    #[test]
    fn test_range_uses_upper_bound() {
        let dose = Dose::from_bounds("1", Some("2")).unwrap();
        assert_eq!(dose.value, 2.0);
        assert!(dose.note.unwrap().contains("upper bound"));
    }

    #[test]
    fn test_from_token() {
        let (dose, suffix) = Dose::from_token("500mg").unwrap();
        assert_eq!(dose.value, 500.0);
        assert_eq!(suffix, "mg");

        let (dose, suffix) = Dose::from_token("1-2").unwrap();
        assert_eq!(dose.value, 2.0);
        assert_eq!(suffix, "");

        let (dose, _) = Dose::from_token("one").unwrap();
        assert_eq!(dose.value, 1.0);

        assert!(Dose::from_token("tablet").is_none());
        assert!(Dose::from_token("1-").is_none());
    }
}
