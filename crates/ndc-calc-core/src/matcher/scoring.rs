//! Combination scoring and ranking. Lower scores win.

use std::cmp::Ordering;

use super::{MAX_OVERFILL_PERCENT, MAX_UNDERFILL_PERCENT};
use crate::models::{Combination, MatchQuality, PackageUnit};

/// Overfill within this distance of zero counts as exact.
const EXACT_EPSILON: f64 = 1e-9;

/// Cost of each package unit handed out.
const PER_UNIT_PENALTY: f64 = 0.1;
/// Cost of each distinct NDC in a combination.
const PER_NDC_PENALTY: f64 = 0.05;
/// Reward per unit of average package size.
const PACKAGE_SIZE_BONUS: f64 = 0.001;

/// `(total - target) / target × 100`; negative for underfill.
pub(super) fn overfill_percent(total: u32, target: f64) -> f64 {
    (f64::from(total) - target) / target * 100.0
}

/// Whether an overfill percentage sits inside the dispensing window.
pub(super) fn within_tolerance(overfill_percent: f64) -> bool {
    overfill_percent <= MAX_OVERFILL_PERCENT + EXACT_EPSILON
        && overfill_percent >= -(MAX_UNDERFILL_PERCENT + EXACT_EPSILON)
}

/// Score and label a set of package units against `target`.
pub(super) fn build_combination(mut packages: Vec<PackageUnit>, target: f64) -> Combination {
    packages.sort_by(|a, b| {
        b.quantity()
            .cmp(&a.quantity())
            .then_with(|| a.package.ndc_key().cmp(&b.package.ndc_key()))
    });

    let total_quantity = packages
        .iter()
        .fold(0u32, |acc, unit| acc.saturating_add(unit.quantity()));
    let overfill = overfill_percent(total_quantity, target);

    let mut combination = Combination {
        packages,
        total_quantity,
        overfill_percent: overfill,
        score: 0.0,
        match_quality: MatchQuality::from_overfill(overfill),
    };
    combination.score = score(&combination);
    combination
}

fn score(combination: &Combination) -> f64 {
    let overfill = combination.overfill_percent;
    let fit = if overfill.abs() < EXACT_EPSILON {
        0.0
    } else if overfill > 0.0 {
        overfill
    } else {
        overfill.abs() * 2.0
    };

    fit + PER_UNIT_PENALTY * f64::from(combination.unit_count())
        + PER_NDC_PENALTY * combination.distinct_ndcs() as f64
        - PACKAGE_SIZE_BONUS * combination.average_package_size()
}

/// One package whose size is exactly the target.
///
/// Above a target of 100,000 the package-size bonus can outweigh a small
/// overfill, so this is checked ahead of the score.
fn is_exact_single(combination: &Combination) -> bool {
    combination.match_quality == MatchQuality::Exact && combination.unit_count() == 1
}

/// Total order used to rank combinations.
///
/// An exact single package first, then score, larger average package, fewer
/// units, fewer NDCs, and finally the combination key so equal candidates
/// always come out in the same order.
pub(super) fn rank(a: &Combination, b: &Combination) -> Ordering {
    is_exact_single(b)
        .cmp(&is_exact_single(a))
        .then_with(|| a.score.total_cmp(&b.score))
        .then_with(|| b.average_package_size().total_cmp(&a.average_package_size()))
        .then_with(|| a.unit_count().cmp(&b.unit_count()))
        .then_with(|| a.distinct_ndcs().cmp(&b.distinct_ndcs()))
        .then_with(|| a.key().cmp(&b.key()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PackageRecord;

    fn units(code: &str, size: u32, count: u32) -> PackageUnit {
        PackageUnit {
            package: PackageRecord::new(code, size),
            count,
        }
    }

    #[test]
    fn test_exact_score() {
        let combo = build_combination(vec![units("12345-6789-1", 60, 1)], 60.0);
        assert_eq!(combo.match_quality, MatchQuality::Exact);
        assert!((combo.score - (0.1 + 0.05 - 0.06)).abs() < 1e-9);
    }

    #[test]
    fn test_underfill_costs_double() {
        let over = build_combination(vec![units("12345-6789-1", 103, 1)], 100.0);
        let under = build_combination(vec![units("12345-6789-2", 97, 1)], 100.0);
        assert!((over.overfill_percent - 3.0).abs() < 1e-9);
        assert!((under.overfill_percent + 3.0).abs() < 1e-9);
        assert!(under.score > over.score);
    }

    #[test]
    fn test_largest_contribution_first() {
        let combo = build_combination(
            vec![units("12345-6789-2", 30, 1), units("12345-6789-1", 90, 1)],
            120.0,
        );
        assert_eq!(combo.primary_ndc(), Some("12345-6789-1"));
        assert_eq!(combo.total_quantity, 120);
    }

    #[test]
    fn test_tolerance_window() {
        assert!(within_tolerance(0.0));
        assert!(within_tolerance(10.0));
        assert!(within_tolerance(-5.0));
        assert!(!within_tolerance(10.5));
        assert!(!within_tolerance(-5.5));
    }

    #[test]
    fn test_exact_single_outranks_lower_score() {
        let exact = build_combination(vec![units("12345-6789-1", 200_000, 1)], 200_000.0);
        let over = build_combination(vec![units("12345-6789-2", 200_001, 1)], 200_000.0);
        assert!(over.score < exact.score);
        assert_eq!(rank(&exact, &over), Ordering::Less);
    }

    #[test]
    fn test_rank_breaks_score_ties_by_package_size() {
        let a = build_combination(vec![units("12345-6789-1", 30, 2)], 60.0);
        let mut b = a.clone();
        b.packages[0].count = 3;
        b.score = a.score;
        assert_eq!(rank(&a, &b), Ordering::Less);
    }
}
