//! Vocabulary normalizer.
//!
//! Handles:
//! - Unit canonicalization (tabs→tablet, cc→ml, mcg stays mcg)
//! - Dosage form canonicalization (oral tablet→tablet, syrup→solution)
//! - Frequency idioms (bid→2/day, once weekly→1/7 per day, prn→as needed)
//! - NDC validation and normalization ([`Ndc`])
//!
//! Lookups are case-, whitespace- and period-insensitive (`B.I.D.` ≡ `bid`).
//! Unknown input yields `None`, never an error.

mod ndc;
mod tables;

pub use ndc::*;

use serde::{Deserialize, Serialize};

use crate::models::Frequency;
use tables::{
    DISPENSING_UNITS, DOSAGE_FORMS, DOSAGE_FORM_KEYWORDS, FREQUENCY_PHRASES,
    FREQUENCY_PHRASES_BY_LENGTH, NUMBER_WORDS, ROUTE_TOKENS, UNITS, UNIT_CLASSES,
};

/// Rounding class of a unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnitClass {
    /// Discrete items (tablets, capsules, patches, ...)
    CountBased,
    /// Measured amounts by volume or weight (ml, mg, g, ...)
    VolumeBased,
    /// Everything else (units, drops, applications)
    Other,
}

/// Canonical lookup key: lowercase, trimmed, single-spaced, with periods
/// removed unless they start the fractional part of a number.
pub fn normalize_key(text: &str) -> String {
    let lower = text.trim().to_lowercase();
    let chars: Vec<char> = lower.chars().collect();

    let mut cleaned = String::with_capacity(lower.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == '.' {
            let prev = if i > 0 { Some(chars[i - 1]) } else { None };
            let next_digit = chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());
            let prev_letter = prev.is_some_and(|p| p.is_alphabetic());
            if next_digit && !prev_letter {
                cleaned.push(c);
            }
            continue;
        }
        if matches!(c, ',' | ';' | ':' | '(' | ')') {
            cleaned.push(' ');
            continue;
        }
        cleaned.push(c);
    }

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical unit for a spelling (`"Tabs"` → `"tablet"`).
pub fn normalize_unit(unit: &str) -> Option<&'static str> {
    UNITS.get(normalize_key(unit).as_str()).copied()
}

/// Canonical dosage form (`"EXTENDED RELEASE ORAL TABLET"` → `"tablet"`).
pub fn normalize_dosage_form(form: &str) -> Option<&'static str> {
    let key = normalize_key(form);
    if key.is_empty() {
        return None;
    }
    if let Some(form) = DOSAGE_FORMS.get(key.as_str()) {
        return Some(form);
    }
    DOSAGE_FORM_KEYWORDS
        .iter()
        .find(|(keyword, _)| key.contains(keyword))
        .map(|(_, form)| *form)
}

/// Exact frequency-phrase lookup (`"b.i.d."` → 2/day, `"prn"` → as needed).
pub fn parse_frequency_token(phrase: &str) -> Option<Frequency> {
    FREQUENCY_PHRASES.get(normalize_key(phrase).as_str()).copied()
}

/// Classify a unit for rounding. Unknown units are [`UnitClass::Other`].
pub fn classify_unit(unit: &str) -> UnitClass {
    normalize_unit(unit)
        .and_then(|canonical| UNIT_CLASSES.get(canonical).copied())
        .unwrap_or(UnitClass::Other)
}

/// Unit a package of the given dosage form is counted in (`"SOLUTION"` → `"ml"`).
pub fn dispensing_unit(dosage_form: &str) -> Option<&'static str> {
    normalize_dosage_form(dosage_form).and_then(|form| DISPENSING_UNITS.get(form).copied())
}

/// Whether a token names a route of administration (`po`, `im`, `orally`, ...).
pub fn is_route_token(token: &str) -> bool {
    ROUTE_TOKENS.contains(normalize_key(token).as_str())
}

/// Spelled-out number (`"two"` → 2.0, `"half"` → 0.5).
pub fn number_word(word: &str) -> Option<f64> {
    NUMBER_WORDS.get(normalize_key(word).as_str()).copied()
}

/// Known frequency phrases that occur inside `key` on word boundaries,
/// longest phrase first. `key` must already be normalized.
pub(crate) fn frequency_phrases_within(key: &str) -> impl Iterator<Item = (usize, &'static str, Frequency)> + '_ {
    let padded = format!(" {} ", key);
    FREQUENCY_PHRASES_BY_LENGTH
        .iter()
        .filter_map(move |(phrase, frequency)| {
            padded
                .find(&format!(" {} ", phrase))
                .map(|position| (position, *phrase, *frequency))
        })
}
