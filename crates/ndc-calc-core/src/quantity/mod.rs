//! Dispense quantity calculation.
//!
//! `quantity = dose × frequency × days_supply`, rounded by unit class:
//! - count-based units round up to whole items
//! - volume/weight units round to a precision that depends on magnitude
//! - everything else rounds up

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::models::{Frequency, ParseStrategyKind, ParsedDirective, Severity, Warning, WarningType};
use crate::vocabulary::{classify_unit, normalize_unit, UnitClass};

pub const MIN_DAYS_SUPPLY: u32 = 1;
pub const MAX_DAYS_SUPPLY: u32 = 365;

/// More items per day than this is flagged.
pub const MAX_COUNT_PER_DAY: f64 = 20.0;
/// More milliliters per day than this is flagged.
pub const MAX_ML_PER_DAY: f64 = 1000.0;

/// Absorbs float noise before rounding up (0.1 × 3 × 10 must stay 3).
///
/// Count rounding is `ceil(raw - CEIL_EPSILON)`, so a raw quantity within
/// 1e-9 above a whole number rounds to that number. Day counts floor with
/// the same tolerance in the other direction.
const CEIL_EPSILON: f64 = 1e-9;
/// Smallest volume ever reported.
const MIN_VOLUME: f64 = 0.01;

/// Quantity errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuantityError {
    #[error("Dose must be a positive number, found {0}")]
    InvalidDose(f64),

    #[error("Unit is missing")]
    MissingUnit,

    #[error("Days supply must be between 1 and 365, found {0}")]
    InvalidDaysSupply(u32),

    #[error("Frequency must be positive, found {0}")]
    InvalidFrequency(f64),

    #[error("Quantity must be a positive number, found {0}")]
    InvalidQuantity(f64),

    #[error("Cannot auto-calculate for as-needed directions; enter quantity manually")]
    AsNeeded,

    #[error("Manual entry is missing the {0}")]
    IncompleteOverride(&'static str),
}

pub type QuantityResult<T> = Result<T, QuantityError>;

/// A computed dispense quantity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quantity {
    /// Rounded quantity to dispense
    pub quantity: f64,
    /// Canonical unit
    pub unit: String,
    pub unit_class: UnitClass,
    /// Quantity before rounding
    pub raw_quantity: f64,
    pub days_supply: u32,
    /// e.g. `1 tablet x 2/day x 30 days = 60 tablet`
    pub breakdown: String,
}

/// Calculate the quantity needed to cover `days_supply` days.
pub fn calculate(directive: &ParsedDirective, days_supply: u32) -> QuantityResult<Quantity> {
    validate_dose(directive.dose)?;
    let unit = validate_unit(&directive.unit)?;
    validate_days_supply(days_supply)?;
    let per_day = validate_frequency(&directive.frequency)?;

    let raw = directive.dose * per_day * f64::from(days_supply);
    let unit_class = classify_unit(&unit);
    let quantity = round_for_class(raw, unit_class);

    let breakdown = format!(
        "{} {} x {}/day x {} days = {} {}",
        format_number(directive.dose),
        unit,
        format_number(per_day),
        days_supply,
        format_number(quantity),
        unit
    );
    debug!(raw, quantity, unit = %unit, ?unit_class, "calculated quantity");

    Ok(Quantity {
        quantity,
        unit,
        unit_class,
        raw_quantity: raw,
        days_supply,
        breakdown,
    })
}

/// Manual substitutions for parts of a directive.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DirectiveOverrides {
    pub dose: Option<f64>,
    pub frequency: Option<Frequency>,
    pub unit: Option<String>,
}

impl DirectiveOverrides {
    pub fn is_empty(&self) -> bool {
        self.dose.is_none() && self.frequency.is_none() && self.unit.is_none()
    }
}

/// Recalculate after replacing dose, frequency and/or unit by hand.
///
/// Without a base directive every field must be overridden. The returned
/// directive is marked [`ParseStrategyKind::Manual`] when anything changed.
pub fn recalculate_with_overrides(
    base: Option<&ParsedDirective>,
    overrides: &DirectiveOverrides,
    days_supply: u32,
) -> QuantityResult<(ParsedDirective, Quantity)> {
    let directive = match base {
        Some(base) => {
            let mut directive = base.clone();
            if let Some(dose) = overrides.dose {
                directive.dose = dose;
                directive.notes.push(format!("dose manually set to {}", format_number(dose)));
            }
            if let Some(frequency) = overrides.frequency {
                directive.frequency = frequency;
                directive
                    .notes
                    .push(format!("frequency manually set to {}", frequency.canonical_phrase()));
            }
            if let Some(unit) = &overrides.unit {
                directive.unit = unit.clone();
                directive.notes.push(format!("unit manually set to {}", unit));
            }
            if !overrides.is_empty() {
                directive.strategy = ParseStrategyKind::Manual;
            }
            directive
        }
        None => {
            let dose = overrides.dose.ok_or(QuantityError::IncompleteOverride("dose"))?;
            let frequency = overrides
                .frequency
                .ok_or(QuantityError::IncompleteOverride("frequency"))?;
            let unit = overrides
                .unit
                .clone()
                .ok_or(QuantityError::IncompleteOverride("unit"))?;
            ParsedDirective {
                dose,
                frequency,
                unit: unit.clone(),
                original_text: format!(
                    "{} {} {}",
                    format_number(dose),
                    unit,
                    frequency.canonical_phrase()
                ),
                strategy: ParseStrategyKind::Manual,
                notes: Vec::new(),
            }
        }
    };

    let quantity = calculate(&directive, days_supply)?;
    Ok((directive, quantity))
}

/// Days a given quantity lasts under a directive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DaysSupplyEstimate {
    /// Whole days covered
    pub days: u32,
    /// Unrounded days
    pub exact: f64,
}

/// Estimate the days supply implied by a quantity: `quantity / (dose × frequency)`.
pub fn estimate_days_supply(
    directive: &ParsedDirective,
    quantity: f64,
) -> QuantityResult<DaysSupplyEstimate> {
    validate_dose(directive.dose)?;
    let per_day = validate_frequency(&directive.frequency)?;
    if !(quantity > 0.0 && quantity.is_finite()) {
        return Err(QuantityError::InvalidQuantity(quantity));
    }

    let exact = quantity / (directive.dose * per_day);
    let days = (exact + CEIL_EPSILON).floor().min(f64::from(u32::MAX)) as u32;
    Ok(DaysSupplyEstimate { days, exact })
}

/// Advisory warnings for quantities that look implausible.
pub fn check_reasonableness(quantity: &Quantity) -> Vec<Warning> {
    let mut warnings = Vec::new();
    let days = f64::from(quantity.days_supply);

    if quantity.unit_class == UnitClass::CountBased {
        let per_day = quantity.quantity / days;
        if per_day > MAX_COUNT_PER_DAY {
            warnings.push(
                Warning::new(
                    WarningType::QuantityReasonableness,
                    Severity::Warning,
                    format!(
                        "{} {} per day exceeds the usual maximum of {}",
                        format_number(per_day),
                        quantity.unit,
                        MAX_COUNT_PER_DAY
                    ),
                )
                .with_data(json!({
                    "quantity": quantity.quantity,
                    "days_supply": quantity.days_supply,
                    "limit_per_day": MAX_COUNT_PER_DAY,
                })),
            );
        }
        if quantity.raw_quantity < 1.0 {
            warnings.push(
                Warning::new(
                    WarningType::QuantityReasonableness,
                    Severity::Warning,
                    format!(
                        "Directions call for less than one {} over the whole supply",
                        quantity.unit
                    ),
                )
                .with_data(json!({ "raw_quantity": quantity.raw_quantity })),
            );
        }
    }

    if quantity.unit == "ml" && quantity.quantity > MAX_ML_PER_DAY * days {
        warnings.push(
            Warning::new(
                WarningType::QuantityReasonableness,
                Severity::Warning,
                format!(
                    "{} ml over {} days exceeds {} ml per day",
                    format_number(quantity.quantity),
                    quantity.days_supply,
                    MAX_ML_PER_DAY
                ),
            )
            .with_data(json!({
                "quantity": quantity.quantity,
                "days_supply": quantity.days_supply,
                "limit_per_day": MAX_ML_PER_DAY,
            })),
        );
    }

    warnings
}

fn validate_dose(dose: f64) -> QuantityResult<()> {
    if dose > 0.0 && dose.is_finite() {
        Ok(())
    } else {
        Err(QuantityError::InvalidDose(dose))
    }
}

/// Canonical unit, or the trimmed text when the unit is not in the vocabulary.
fn validate_unit(unit: &str) -> QuantityResult<String> {
    let trimmed = unit.trim();
    if trimmed.is_empty() {
        return Err(QuantityError::MissingUnit);
    }
    Ok(normalize_unit(trimmed)
        .map(str::to_string)
        .unwrap_or_else(|| trimmed.to_lowercase()))
}

fn validate_days_supply(days_supply: u32) -> QuantityResult<()> {
    if (MIN_DAYS_SUPPLY..=MAX_DAYS_SUPPLY).contains(&days_supply) {
        Ok(())
    } else {
        Err(QuantityError::InvalidDaysSupply(days_supply))
    }
}

fn validate_frequency(frequency: &Frequency) -> QuantityResult<f64> {
    match frequency {
        Frequency::AsNeeded => Err(QuantityError::AsNeeded),
        Frequency::TimesPerDay(n) if *n > 0.0 && n.is_finite() => Ok(*n),
        Frequency::TimesPerDay(n) => Err(QuantityError::InvalidFrequency(*n)),
    }
}

fn round_for_class(raw: f64, unit_class: UnitClass) -> f64 {
    match unit_class {
        UnitClass::CountBased | UnitClass::Other => (raw - CEIL_EPSILON).ceil().max(1.0),
        UnitClass::VolumeBased => {
            let rounded = if raw < 1.0 {
                (raw * 100.0).round() / 100.0
            } else if raw < 10.0 {
                (raw * 10.0).round() / 10.0
            } else {
                raw.round()
            };
            rounded.max(MIN_VOLUME)
        }
    }
}

/// `2`, `0.5`, `4.8` (no trailing zeros, at most 4 decimals).
fn format_number(value: f64) -> String {
    let text = format!("{:.4}", value);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}
