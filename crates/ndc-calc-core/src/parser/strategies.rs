//! The individual directive parsing strategies.

use std::sync::LazyLock;

use regex::Regex;

use super::dose::{Dose, AMOUNT_PATTERN};
use super::frequency::resolve_frequency;
use super::{ParseStrategy, StrategyRejection};
use crate::models::{ParseStrategyKind, ParsedDirective};
use crate::vocabulary::{is_route_token, normalize_key, normalize_unit};

const VERBS: &str =
    r"(?:take|give|use|inhale|inject|apply|instill|insert|chew|dissolve|place|administer)";

static STRUCTURED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^{VERBS}\s+(?P<dose>{AMOUNT_PATTERN})(?:\s*(?:-|to)\s*(?P<upper>{AMOUNT_PATTERN}))?\s*(?P<unit>[a-zµ]+)\b(?P<rest>.*)$"
    ))
    .expect("valid structured pattern")
});

static SIMPLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?P<dose>{AMOUNT_PATTERN})(?:\s*(?:-|to)\s*(?P<upper>{AMOUNT_PATTERN}))?\s*(?P<unit>[a-zµ]+)\s+(?P<rest>.+)$"
    ))
    .expect("valid simple pattern")
});

static FIRST_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?:^|\s)(?P<dose>{AMOUNT_PATTERN})")).expect("valid number pattern")
});

/// Unit keywords for the fallback strategy, checked in order. Longer words
/// that contain a shorter keyword come first ("tablespoon" before "tab").
const UNIT_KEYWORDS: &[(&str, &str)] = &[
    ("tablespoon", "tbsp"),
    ("teaspoon", "tsp"),
    ("tablet", "tablet"),
    ("capsule", "capsule"),
    ("ml", "ml"),
    ("mcg", "mcg"),
    ("mg", "mg"),
    ("puff", "puff"),
    ("inhalation", "puff"),
    ("patch", "patch"),
    ("suppositor", "suppository"),
    ("spray", "spray"),
    ("lozenge", "lozenge"),
    ("drop", "drop"),
    ("unit", "unit"),
    ("tab", "tablet"),
    ("cap", "capsule"),
];

/// Abbreviated directions end in a short code ("bid", "q6h", "qd prn").
const MAX_ABBREVIATED_FREQUENCY_TOKENS: usize = 2;

fn reject(reason: impl Into<String>) -> StrategyRejection {
    StrategyRejection(reason.into())
}

/// Assemble a directive from the pieces a strategy extracted.
fn build(
    strategy: ParseStrategyKind,
    text: &str,
    dose: Dose,
    unit: &str,
    frequency_text: &str,
) -> Result<ParsedDirective, StrategyRejection> {
    if !(dose.value > 0.0 && dose.value.is_finite()) {
        return Err(reject(format!("dose must be positive, found {}", dose.value)));
    }

    let unit = normalize_unit(unit).ok_or_else(|| reject(format!("unrecognized unit '{}'", unit)))?;

    let frequency_text = frequency_text.trim();
    if frequency_text.is_empty() {
        return Err(reject("no frequency phrase"));
    }
    let resolution = resolve_frequency(frequency_text)
        .ok_or_else(|| reject(format!("unrecognized frequency '{}'", frequency_text)))?;

    let notes = dose.note.into_iter().chain(resolution.note).collect();

    Ok(ParsedDirective {
        dose: dose.value,
        frequency: resolution.frequency,
        unit: unit.to_string(),
        original_text: text.trim().to_string(),
        strategy,
        notes,
    })
}

/// `"<verb> <dose> <unit> <frequency>"`, e.g. "Take 1 tablet by mouth twice daily".
pub struct StructuredStrategy;

impl ParseStrategy for StructuredStrategy {
    fn kind(&self) -> ParseStrategyKind {
        ParseStrategyKind::Structured
    }

    fn parse(&self, text: &str) -> Result<ParsedDirective, StrategyRejection> {
        let key = normalize_key(text);
        let captures = STRUCTURED
            .captures(&key)
            .ok_or_else(|| reject("expected '<verb> <dose> <unit> <frequency>'"))?;

        let dose = Dose::from_bounds(
            &captures["dose"],
            captures.name("upper").map(|m| m.as_str()),
        )
        .ok_or_else(|| reject("unreadable dose"))?;

        build(self.kind(), text, dose, &captures["unit"], &captures["rest"])
    }
}

/// Prescriber shorthand: `"1 tab po bid"`, `"500mg po q6h"`.
pub struct AbbreviatedStrategy;

impl ParseStrategy for AbbreviatedStrategy {
    fn kind(&self) -> ParseStrategyKind {
        ParseStrategyKind::Abbreviated
    }

    fn parse(&self, text: &str) -> Result<ParsedDirective, StrategyRejection> {
        let key = normalize_key(text);
        let tokens: Vec<&str> = key.split(' ').collect();

        let (dose, attached_unit) = tokens
            .first()
            .and_then(|token| Dose::from_token(token))
            .ok_or_else(|| reject("directions do not start with a dose"))?;

        let mut index = 1;
        let unit = if attached_unit.is_empty() {
            index += 1;
            tokens.get(1).copied().ok_or_else(|| reject("no unit after dose"))?
        } else {
            attached_unit
        };

        while index < tokens.len() {
            if is_route_token(tokens[index]) {
                index += 1;
            } else if tokens[index] == "by" && tokens.get(index + 1) == Some(&"mouth") {
                index += 2;
            } else {
                break;
            }
        }

        let remaining = &tokens[index.min(tokens.len())..];
        if remaining.len() > MAX_ABBREVIATED_FREQUENCY_TOKENS {
            return Err(reject("frequency is not an abbreviation"));
        }

        build(self.kind(), text, dose, unit, &remaining.join(" "))
    }
}

/// `"<dose> <unit> <frequency>"` without a leading verb.
pub struct SimpleStrategy;

impl ParseStrategy for SimpleStrategy {
    fn kind(&self) -> ParseStrategyKind {
        ParseStrategyKind::Simple
    }

    fn parse(&self, text: &str) -> Result<ParsedDirective, StrategyRejection> {
        let key = normalize_key(text);
        let captures = SIMPLE
            .captures(&key)
            .ok_or_else(|| reject("expected '<dose> <unit> <frequency>'"))?;

        let dose = Dose::from_bounds(
            &captures["dose"],
            captures.name("upper").map(|m| m.as_str()),
        )
        .ok_or_else(|| reject("unreadable dose"))?;

        build(self.kind(), text, dose, &captures["unit"], &captures["rest"])
    }
}

/// Last resort: first number is the dose, unit by keyword, frequency from anywhere.
pub struct ComplexStrategy;

impl ParseStrategy for ComplexStrategy {
    fn kind(&self) -> ParseStrategyKind {
        ParseStrategyKind::Complex
    }

    fn parse(&self, text: &str) -> Result<ParsedDirective, StrategyRejection> {
        let key = normalize_key(text);

        let number = FIRST_NUMBER
            .captures(&key)
            .map(|c| c["dose"].to_string())
            .ok_or_else(|| reject("no number in directions"))?;
        let dose = Dose::from_bounds(&number, None).ok_or_else(|| reject("unreadable dose"))?;

        let unit = UNIT_KEYWORDS
            .iter()
            .find(|(keyword, _)| key.contains(keyword))
            .map(|(_, unit)| *unit)
            .ok_or_else(|| reject("no unit keyword in directions"))?;

        build(self.kind(), text, dose, unit, &key)
    }
}
