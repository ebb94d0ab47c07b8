//! Parsed prescription directions (SIG).

use serde::{Deserialize, Serialize};

/// How often a dose is taken.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "per_day", rename_all = "snake_case")]
pub enum Frequency {
    /// Scheduled administrations per day (always > 0)
    TimesPerDay(f64),
    /// PRN: recognized, but there is no fixed schedule to compute from
    AsNeeded,
}

impl Frequency {
    /// Administrations per day, or `None` for as-needed directions.
    pub fn per_day(&self) -> Option<f64> {
        match self {
            Frequency::TimesPerDay(n) => Some(*n),
            Frequency::AsNeeded => None,
        }
    }

    pub fn is_as_needed(&self) -> bool {
        matches!(self, Frequency::AsNeeded)
    }

    /// Phrase used when rendering a directive back into text.
    ///
    /// Every phrase produced here resolves back to the same value through the
    /// directive parser.
    pub fn canonical_phrase(&self) -> String {
        let per_day = match self {
            Frequency::AsNeeded => return "as needed".into(),
            Frequency::TimesPerDay(n) => *n,
        };

        match per_day {
            n if n == 1.0 => return "once daily".into(),
            n if n == 2.0 => return "twice daily".into(),
            n if n == 3.0 => return "three times daily".into(),
            n if n == 4.0 => return "four times daily".into(),
            n if n.fract() == 0.0 => return format!("{} times daily", n),
            _ => {}
        }

        if per_day > 1.0 {
            let hours = 24.0 / per_day;
            if hours.fract() == 0.0 && 24.0 / hours == per_day {
                return format!("every {} hours", hours);
            }
        }

        let per_week = (per_day * 7.0).round();
        if (1.0..7.0).contains(&per_week) && per_week / 7.0 == per_day {
            return if per_week == 1.0 {
                "once weekly".into()
            } else {
                format!("{} times weekly", per_week)
            };
        }

        let days = 1.0 / per_day;
        if days.fract() == 0.0 && 1.0 / days == per_day {
            return format!("every {} days", days);
        }

        format!("{} times per day", per_day)
    }
}

/// Which parser strategy produced a directive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParseStrategyKind {
    Structured,
    Abbreviated,
    Simple,
    Complex,
    /// Built from manual overrides rather than parsed text
    Manual,
}

/// A successfully parsed directive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParsedDirective {
    /// Amount per administration (> 0)
    pub dose: f64,
    /// Administrations per day, or as needed
    pub frequency: Frequency,
    /// Canonical unit (e.g., "tablet", "ml")
    pub unit: String,
    /// Directions as received
    pub original_text: String,
    /// Strategy that produced this directive
    pub strategy: ParseStrategyKind,
    /// Caveats noticed while parsing (dose range, mixed PRN schedule, ...)
    pub notes: Vec<String>,
}

impl ParsedDirective {
    /// Amount taken per day, if the schedule is fixed.
    pub fn daily_amount(&self) -> Option<f64> {
        self.frequency.per_day().map(|f| self.dose * f)
    }

    /// Render as `Take <dose> <unit> <frequency phrase>`.
    pub fn canonical_sig(&self) -> String {
        format!(
            "Take {} {} {}",
            self.dose,
            self.unit,
            self.frequency.canonical_phrase()
        )
    }
}
