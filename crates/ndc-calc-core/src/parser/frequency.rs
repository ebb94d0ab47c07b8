//! Frequency resolution for free-text directions.
//!
//! Resolution order:
//! 1. Exact phrase lookup (`"bid"`, `"once weekly"`)
//! 2. Known phrases contained in the text, longest first
//! 3. Numeric patterns (`3 times a day`, `every 8 hours`, `q4-6h`, `every 3 days`)
//!
//! A PRN phrase alone resolves to [`Frequency::AsNeeded`]. When the text also
//! carries a fixed schedule, the schedule wins and a note records the PRN part.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::models::Frequency;
use crate::vocabulary::{frequency_phrases_within, normalize_key, number_word, parse_frequency_token};

const COUNT: &str = r"(\d+(?:\.\d+)?|one|two|three|four|five|six|seven|eight|nine|ten)";
const HOURS: &str = r"(?:hours?|hrs?|h)\b";

static TIMES_PER_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b{COUNT}\s*(?:x|times?)\s*(?:(?:a|per|each|every)\s+)?(?:day|daily)\b"
    ))
    .expect("valid times-per-day pattern")
});

static TIMES_PER_WEEK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b{COUNT}\s*(?:x|times?)\s*(?:(?:a|per|each|every)\s+)?(?:week|weekly|wk)\b"
    ))
    .expect("valid times-per-week pattern")
});

static EVERY_N_HOURS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\bevery\s+(\d+(?:\.\d+)?)(?:\s*(?:-|to)\s*\d+(?:\.\d+)?)?\s*{HOURS}"
    ))
    .expect("valid every-n-hours pattern")
});

static Q_N_HOURS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\bq\s*(\d+(?:\.\d+)?)(?:\s*-\s*\d+(?:\.\d+)?)?\s*{HOURS}"
    ))
    .expect("valid q-n-hours pattern")
});

static EVERY_N_DAYS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bevery\s+(\d+)\s*days?\b").expect("valid every-n-days pattern")
});

/// Words that turn a following phrase into part of a count ("3 times daily").
const COUNT_CONNECTORS: [&str; 3] = ["times", "time", "x"];

/// Hour units that end an explicit interval ("every 12 hours daily").
const HOUR_UNITS: [&str; 5] = ["hours", "hour", "hrs", "hr", "h"];

/// A resolved frequency plus any caveat noticed on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyResolution {
    pub frequency: Frequency,
    pub note: Option<String>,
}

/// Resolve the frequency expressed somewhere in `text`.
pub fn resolve_frequency(text: &str) -> Option<FrequencyResolution> {
    let key = normalize_key(text);
    if key.is_empty() {
        return None;
    }

    if let Some(frequency) = parse_frequency_token(&key) {
        return Some(FrequencyResolution {
            frequency,
            note: None,
        });
    }

    let as_needed = contains_as_needed(&key);
    let scheduled = contained_schedule(&key).or_else(|| pattern_schedule(&key));

    match (scheduled, as_needed) {
        (Some(per_day), true) => Some(FrequencyResolution {
            frequency: Frequency::TimesPerDay(per_day),
            note: Some("as-needed wording ignored in favour of the fixed schedule".into()),
        }),
        (Some(per_day), false) => Some(FrequencyResolution {
            frequency: Frequency::TimesPerDay(per_day),
            note: None,
        }),
        (None, true) => Some(FrequencyResolution {
            frequency: Frequency::AsNeeded,
            note: None,
        }),
        (None, false) => None,
    }
}

fn contains_as_needed(key: &str) -> bool {
    frequency_phrases_within(key).any(|(_, _, frequency)| frequency.is_as_needed())
}

/// First scheduled phrase found in the text, longest phrase first.
fn contained_schedule(key: &str) -> Option<f64> {
    let padded = format!(" {} ", key);
    frequency_phrases_within(key)
        .filter(|(position, _, _)| {
            !follows_count_connector(&padded, *position) && !follows_hour_interval(&padded, *position)
        })
        .find_map(|(_, _, frequency)| frequency.per_day())
}

/// A phrase right after an hour interval only restates it; the interval
/// itself is read by the numeric patterns.
fn follows_hour_interval(padded: &str, position: usize) -> bool {
    padded[..position]
        .split_whitespace()
        .last()
        .is_some_and(|word| {
            HOUR_UNITS.contains(&word)
                || word
                    .strip_prefix('q')
                    .and_then(|rest| rest.strip_suffix('h'))
                    .is_some_and(|hours| hours.split('-').all(|n| n.parse::<f64>().is_ok()))
        })
}

fn follows_count_connector(padded: &str, position: usize) -> bool {
    padded[..position]
        .split_whitespace()
        .last()
        .is_some_and(|word| {
            COUNT_CONNECTORS.contains(&word)
                || word
                    .strip_suffix('x')
                    .is_some_and(|count| count.parse::<f64>().is_ok())
        })
}

fn pattern_schedule(key: &str) -> Option<f64> {
    if let Some(hours) = Q_N_HOURS.captures(key).and_then(|c| capture_count(&c)) {
        return positive(24.0 / hours, hours);
    }
    if let Some(hours) = EVERY_N_HOURS.captures(key).and_then(|c| capture_count(&c)) {
        return positive(24.0 / hours, hours);
    }
    if let Some(times) = TIMES_PER_DAY.captures(key).and_then(|c| capture_count(&c)) {
        return positive(times, times);
    }
    if let Some(times) = TIMES_PER_WEEK.captures(key).and_then(|c| capture_count(&c)) {
        return positive(times / 7.0, times);
    }
    if let Some(days) = EVERY_N_DAYS.captures(key).and_then(|c| capture_count(&c)) {
        return positive(1.0 / days, days);
    }
    None
}

fn capture_count(captures: &Captures<'_>) -> Option<f64> {
    let raw = captures.get(1)?.as_str();
    raw.parse::<f64>().ok().or_else(|| number_word(raw))
}

/// `per_day` if the count it was derived from is usable.
fn positive(per_day: f64, count: f64) -> Option<f64> {
    (count > 0.0 && per_day.is_finite()).then_some(per_day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn per_day(text: &str) -> Option<f64> {
        resolve_frequency(text).and_then(|r| r.frequency.per_day())
    }

    #[test]
    fn test_exact_phrases() {
        assert_eq!(per_day("bid"), Some(2.0));
        assert_eq!(per_day("Q.I.D."), Some(4.0));
        assert_eq!(per_day("once weekly"), Some(1.0 / 7.0));
    }

    #[test]
    fn test_contained_phrases() {
        assert_eq!(per_day("by mouth twice daily with food"), Some(2.0));
        assert_eq!(per_day("orally every day"), Some(1.0));
        assert_eq!(per_day("at bedtime"), Some(1.0));
    }

    #[test]
    fn test_count_connector_blocks_bare_daily() {
        assert_eq!(per_day("3 times daily"), Some(3.0));
        assert_eq!(per_day("5 x daily"), Some(5.0));
        assert_eq!(per_day("six times a day"), Some(6.0));
    }

    #[test]
    fn test_hour_intervals() {
        assert_eq!(per_day("every 8 hours"), Some(3.0));
        assert_eq!(per_day("q6h"), Some(4.0));
        assert_eq!(per_day("q 12 hrs"), Some(2.0));
        // Ranges use the shorter interval
        assert_eq!(per_day("every 4-6 hours"), Some(6.0));
        assert_eq!(per_day("q4-6h"), Some(6.0));
    }

    #[test]
    fn test_hour_interval_not_overridden_by_daily() {
        assert_eq!(per_day("every 12 hours daily"), Some(2.0));
        assert_eq!(per_day("q8h daily"), Some(3.0));
        assert_eq!(per_day("every 6 hrs every day"), Some(4.0));
        // Without an interval the phrase still applies
        assert_eq!(per_day("with food daily"), Some(1.0));
    }

    #[test]
    fn test_weekly_and_day_intervals() {
        assert_eq!(per_day("2 times a week"), Some(2.0 / 7.0));
        assert_eq!(per_day("3x weekly"), Some(3.0 / 7.0));
        assert_eq!(per_day("every 3 days"), Some(1.0 / 3.0));
    }

    #[test]
    fn test_as_needed() {
        let resolution = resolve_frequency("as needed for pain").unwrap();
        assert_eq!(resolution.frequency, Frequency::AsNeeded);
        assert!(resolution.note.is_none());
    }

    #[test]
    fn test_schedule_wins_over_prn() {
        let resolution = resolve_frequency("every 6 hours as needed for pain").unwrap();
        assert_eq!(resolution.frequency, Frequency::TimesPerDay(4.0));
        assert!(resolution.note.is_some());
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert_eq!(resolve_frequency("every 0 hours"), None);
        assert_eq!(resolve_frequency("0 times a day"), None);
    }

    #[test]
    fn test_unrecognized() {
        assert_eq!(resolve_frequency("with food"), None);
        assert_eq!(resolve_frequency(""), None);
    }
}
