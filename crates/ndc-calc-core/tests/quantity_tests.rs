//! Quantity calculation integration tests.

use ndc_calc_core::models::{Frequency, ParseStrategyKind, ParsedDirective, WarningType};
use ndc_calc_core::parser::parse_directions;
use ndc_calc_core::quantity::{
    calculate, check_reasonableness, estimate_days_supply, recalculate_with_overrides,
    DirectiveOverrides, QuantityError,
};
use ndc_calc_core::vocabulary::UnitClass;
use proptest::prelude::*;

fn directive(dose: f64, per_day: f64, unit: &str) -> ParsedDirective {
    ParsedDirective {
        dose,
        frequency: Frequency::TimesPerDay(per_day),
        unit: unit.to_string(),
        original_text: String::new(),
        strategy: ParseStrategyKind::Manual,
        notes: vec![],
    }
}

#[test]
fn test_twice_daily_for_thirty_days() {
    let parsed = parse_directions("Take 1 tablet twice daily").unwrap();
    let quantity = calculate(&parsed, 30).unwrap();

    assert_eq!(quantity.quantity, 60.0);
    assert_eq!(quantity.unit, "tablet");
    assert_eq!(quantity.unit_class, UnitClass::CountBased);
    assert_eq!(quantity.breakdown, "1 tablet x 2/day x 30 days = 60 tablet");
    assert!(check_reasonableness(&quantity).is_empty());
}

#[test]
fn test_liquid_keeps_volume() {
    let parsed = parse_directions("Take 7.5 mL by mouth every 8 hours").unwrap();
    let quantity = calculate(&parsed, 10).unwrap();

    assert_eq!(quantity.unit_class, UnitClass::VolumeBased);
    assert_eq!(quantity.quantity, 225.0);
}

#[test]
fn test_as_needed_cannot_be_calculated() {
    let parsed = parse_directions("Take 1 tablet as needed").unwrap();
    assert_eq!(calculate(&parsed, 30), Err(QuantityError::AsNeeded));
}

#[test]
fn test_days_supply_bounds() {
    let parsed = directive(1.0, 1.0, "tablet");
    assert_eq!(calculate(&parsed, 0), Err(QuantityError::InvalidDaysSupply(0)));
    assert_eq!(calculate(&parsed, 366), Err(QuantityError::InvalidDaysSupply(366)));
    assert!(calculate(&parsed, 365).is_ok());
}

#[test]
fn test_excessive_daily_count_flagged() {
    let quantity = calculate(&directive(6.0, 4.0, "tablet"), 30).unwrap();
    let warnings = check_reasonableness(&quantity);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].warning_type, WarningType::QuantityReasonableness);
}

#[test]
fn test_manual_override_of_prn() {
    let parsed = parse_directions("Take 1 tablet as needed").unwrap();
    let overrides = DirectiveOverrides {
        frequency: Some(Frequency::TimesPerDay(3.0)),
        ..DirectiveOverrides::default()
    };

    let (updated, quantity) = recalculate_with_overrides(Some(&parsed), &overrides, 10).unwrap();
    assert_eq!(updated.strategy, ParseStrategyKind::Manual);
    assert_eq!(quantity.quantity, 30.0);
    assert_eq!(updated.notes.len(), 1);
}

#[test]
fn test_manual_entry_needs_every_field() {
    let overrides = DirectiveOverrides {
        dose: Some(1.0),
        unit: Some("tablet".into()),
        ..DirectiveOverrides::default()
    };
    assert_eq!(
        recalculate_with_overrides(None, &overrides, 30).unwrap_err(),
        QuantityError::IncompleteOverride("frequency")
    );
}

proptest! {
    #[test]
    fn prop_count_quantity_is_ceiling(
        dose in prop::sample::select(vec![0.5, 1.0, 1.5, 2.0, 3.0, 4.0]),
        per_day in 1u32..=4,
        days in 1u32..=365,
        unit in prop::sample::select(vec!["tablet", "capsule", "patch"]),
    ) {
        let quantity = calculate(&directive(dose, f64::from(per_day), unit), days).unwrap();
        let expected = (dose * f64::from(per_day) * f64::from(days)).ceil();
        prop_assert_eq!(quantity.quantity, expected);
        prop_assert!(quantity.quantity >= quantity.raw_quantity);
    }

    #[test]
    fn prop_count_quantity_covers_the_supply(
        dose in prop::sample::select(vec![0.5, 1.0, 1.5, 2.0, 3.0]),
        per_day in prop::sample::select(vec![1.0, 2.0, 3.0, 4.0, 6.0, 0.5, 1.0 / 7.0]),
        days in 1u32..=365,
    ) {
        let parsed = directive(dose, per_day, "tablet");
        let quantity = calculate(&parsed, days).unwrap();
        let estimate = estimate_days_supply(&parsed, quantity.quantity).unwrap();
        prop_assert!(estimate.days >= days);
    }

    #[test]
    fn prop_volume_is_never_below_minimum(
        dose in 0.001f64..50.0,
        per_day in prop::sample::select(vec![1.0, 2.0, 3.0, 4.0, 1.0 / 7.0]),
        days in 1u32..=365,
    ) {
        let quantity = calculate(&directive(dose, per_day, "ml"), days).unwrap();
        prop_assert!(quantity.quantity >= 0.01);
        prop_assert!(quantity.quantity.is_finite());
    }
}
